use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use sqlx::PgPool;
use tracing::info;
use userbase_shared::auth::password::validate_password_strength;
use userbase_shared::config::Config;
use userbase_shared::db::migrations::{get_migration_status, run_migrations};
use userbase_shared::models::account::{Account, CreateAccount};
use userbase_shared::models::group::Group;
use userbase_shared::models::group_role::{GroupRoleAssignment, Role};
use userbase_shared::models::profile::Profile;

#[derive(Parser)]
#[command(name = "userbase-admin")]
#[command(about = "Operator tooling for userbase accounts, groups and roles")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create the database if needed and apply pending migrations
    Migrate,

    /// List accounts, newest first
    List {
        #[arg(long, default_value_t = 50)]
        limit: i64,

        #[arg(long, default_value_t = 0)]
        offset: i64,
    },

    /// Create an inactive account
    CreateAccount {
        username: String,
        email: String,

        /// Plaintext password, hashed before storage
        #[arg(long, env = "USERBASE_PASSWORD")]
        password: String,
    },

    /// Create a group
    CreateGroup { name: String },

    /// Issue a fresh activation code, replacing any previous one
    IssueCode { username: String },

    /// Activate an account with its activation code
    Activate { username: String, code: String },

    /// Give an account a role in a group
    AddRole {
        username: String,
        group: String,

        /// One of: user, moderator, admin
        #[arg(default_value_t = Role::User)]
        role: Role,
    },

    /// Replace an account's role in a group
    ChangeRole {
        username: String,
        group: String,
        role: Role,
    },

    /// Remove an account's role in a group
    RemoveRole { username: String, group: String },

    /// Print an account with its profile and group roles
    Show { username: String },
}

impl Cli {
    pub async fn run(self, config: &Config, pool: &PgPool) -> Result<()> {
        match self.command {
            Commands::Migrate => {
                run_migrations(pool).await?;
                let status = get_migration_status(pool).await?;
                println!(
                    "{} migrations applied, latest {:?}",
                    status.applied_migrations, status.latest_version
                );
            }
            Commands::List { limit, offset } => {
                let total = Account::count(pool).await?;
                for account in Account::list(pool, limit, offset).await? {
                    let state = if account.is_active { "active" } else { "inactive" };
                    println!("{}  {:<24} {:<8} {}", account.id, account.username, state, account.email);
                }
                println!("{} accounts", total);
            }
            Commands::CreateAccount {
                username,
                email,
                password,
            } => {
                validate_password_strength(&password).map_err(anyhow::Error::msg)?;
                let data = CreateAccount::with_password(&username, &email, &password)?;
                let account = Account::create(pool, data).await?;
                println!("{}", account.id);
            }
            Commands::CreateGroup { name } => {
                let group = Group::create(pool, &name).await?;
                println!("{}", group.id);
            }
            Commands::IssueCode { username } => {
                let account = account_by_username(pool, &username).await?;
                let code =
                    Account::issue_activation_code(pool, account.id, config.activation_code_length)
                        .await?
                        .context("account disappeared while issuing code")?;
                println!("{}", code);
            }
            Commands::Activate { username, code } => {
                let account = account_by_username(pool, &username).await?;
                if !Account::activate(pool, account.id, &code).await? {
                    bail!("activation code rejected for {}", username);
                }
                info!(username = %username, "Activated");
            }
            Commands::AddRole {
                username,
                group,
                role,
            } => {
                let account = account_by_username(pool, &username).await?;
                let group = group_by_name(pool, &group).await?;
                GroupRoleAssignment::add_role(pool, account.id, group.id, role).await?;
            }
            Commands::ChangeRole {
                username,
                group,
                role,
            } => {
                let account = account_by_username(pool, &username).await?;
                let group = group_by_name(pool, &group).await?;
                GroupRoleAssignment::change_role(pool, account.id, group.id, role).await?;
            }
            Commands::RemoveRole { username, group } => {
                let account = account_by_username(pool, &username).await?;
                let group = group_by_name(pool, &group).await?;
                GroupRoleAssignment::remove_role(pool, account.id, group.id).await?;
            }
            Commands::Show { username } => {
                let account = account_by_username(pool, &username).await?;
                println!("{} <{}>", account.username, account.email);
                println!("  id:        {}", account.id);
                println!("  active:    {}", account.is_active);
                println!("  site role: {}", account.site_role);

                if let Some(profile) = Profile::find_by_account(pool, account.id).await? {
                    println!("  {}", profile.label(&account));
                }

                for summary in GroupRoleAssignment::summaries_for_account(pool, account.id).await? {
                    println!("  {}", summary);
                }
            }
        }

        Ok(())
    }
}

async fn account_by_username(pool: &PgPool, username: &str) -> Result<Account> {
    Account::find_by_username(pool, username)
        .await?
        .with_context(|| format!("no account named {}", username))
}

async fn group_by_name(pool: &PgPool, name: &str) -> Result<Group> {
    Group::find_by_name(pool, name)
        .await?
        .with_context(|| format!("no group named {}", name))
}
