use anyhow::Context;
use clap::{Parser, Subcommand};
use courier_config::load as load_config;
use courier_database::{run_migrations, ConversationRepository, PointerCheck};
use courier_runtime::{telemetry, CourierServices};
use sqlx::{Row, SqlitePool};
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "courier")]
#[command(about = "Courier chat store administration")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply pending database migrations
    Migrate,
    /// Dump conversations with their last message pointer and message counts
    DumpData,
    /// Compare every conversation's last message pointer with its newest message
    VerifyPointers {
        /// Rewrite drifted pointers instead of only reporting them
        #[arg(long)]
        repair: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = load_config().context("failed to load configuration")?;
    telemetry::init_tracing(&config.logging).context("failed to initialise tracing")?;

    let services = CourierServices::initialise(&config)
        .await
        .context("failed to initialise courier services")?;

    match cli.command {
        Commands::Migrate => migrate(&services.db_pool).await,
        Commands::DumpData => dump_data(&services.db_pool).await,
        Commands::VerifyPointers { repair } => {
            let drifted = verify_pointers(&services.db_pool, repair).await?;
            if drifted > 0 && !repair {
                anyhow::bail!("{drifted} conversation(s) have a drifted last message pointer");
            }
            Ok(())
        }
    }
}

async fn migrate(pool: &SqlitePool) -> anyhow::Result<()> {
    // initialisation already migrated; running again reports the applied set
    run_migrations(pool)
        .await
        .context("failed to run database migrations")?;

    let applied: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM _sqlx_migrations WHERE success = 1")
        .fetch_one(pool)
        .await
        .context("failed to count applied migrations")?;

    info!(applied, "database schema is up to date");
    println!("{applied} migration(s) applied");
    Ok(())
}

async fn dump_data(pool: &SqlitePool) -> anyhow::Result<()> {
    let users = sqlx::query("SELECT id, name, created_at FROM users ORDER BY id")
        .fetch_all(pool)
        .await
        .context("failed to fetch users")?;

    println!("=== USERS ===");
    if users.is_empty() {
        println!("No users found in database");
    } else {
        println!("Found {} users:", users.len());
        println!("{:<6} {:<18} {:<30}", "ID", "Name", "Created At");
        println!("{}", "-".repeat(56));

        for user in users {
            let id: i64 = user.get("id");
            let name: String = user.get("name");
            let created_at: String = user.get("created_at");
            println!("{:<6} {:<18} {:<30}", id, name, created_at);
        }
    }

    println!("\n=== CONVERSATIONS ===");
    let conversations = sqlx::query(
        r#"
        SELECT c.id, c.name, c.kind, c.last_message_id,
               (SELECT COUNT(*) FROM memberships mb WHERE mb.conversation_id = c.id) AS members,
               (SELECT COUNT(*) FROM messages m WHERE m.conversation_id = c.id) AS messages
        FROM conversations c
        ORDER BY c.id
        "#,
    )
    .fetch_all(pool)
    .await
    .context("failed to fetch conversations")?;

    if conversations.is_empty() {
        println!("No conversations found in database");
    } else {
        println!("Found {} conversations:", conversations.len());
        println!(
            "{:<6} {:<34} {:<8} {:<14} {:<8} {:<8}",
            "ID", "Name", "Kind", "Last Message", "Members", "Messages"
        );
        println!("{}", "-".repeat(82));

        for conversation in conversations {
            let id: i64 = conversation.get("id");
            let name: String = conversation.get("name");
            let kind: String = conversation.get("kind");
            let last_message_id: Option<i64> = conversation.get("last_message_id");
            let members: i64 = conversation.get("members");
            let messages: i64 = conversation.get("messages");

            println!(
                "{:<6} {:<34} {:<8} {:<14} {:<8} {:<8}",
                id,
                name,
                kind,
                last_message_id
                    .map(|id| id.to_string())
                    .unwrap_or("NULL".to_string()),
                members,
                messages
            );
        }
    }

    Ok(())
}

/// Check every conversation's pointer, repairing drift when asked.
///
/// Returns the number of conversations whose pointer had drifted.
async fn verify_pointers(pool: &SqlitePool, repair: bool) -> anyhow::Result<usize> {
    let conversations = ConversationRepository::new(pool.clone());
    let ids = conversations
        .all_ids()
        .await
        .context("failed to list conversations")?;

    let mut drifted = 0;
    for id in &ids {
        let result = if repair {
            conversations.repair_pointer(*id).await
        } else {
            conversations.verify_pointer(*id).await
        };
        let check = result.with_context(|| format!("failed to check conversation {id}"))?;

        if let PointerCheck::Drifted { stored, newest } = check {
            drifted += 1;
            warn!(conversation_id = id, ?stored, ?newest, repaired = repair, "pointer drift");
            println!(
                "conversation {id}: stored {:?}, newest {:?}{}",
                stored,
                newest,
                if repair { " (repaired)" } else { "" }
            );
        }
    }

    info!(checked = ids.len(), drifted, repair, "pointer verification finished");
    println!("{} conversation(s) checked, {drifted} drifted", ids.len());
    Ok(drifted)
}
