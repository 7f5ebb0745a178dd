//! Authentication and user management commands
//!
//! Accounts come from the built-in demo directory, so user changes last for
//! one invocation only. The logged-in session is saved next to the config
//! file and restored on every run.

use anyhow::{Context as _, Result};
use clap::{Args, Subcommand};
use comfy_table::Cell;
use dialoguer::{Confirm, Input, Password};
use stock_dashboard_core::{
    GuardOutcome, LoginRequest, NewUser, RegisterRequest, Role, SessionUser, UserId, UserUpdate,
};

use crate::context::Context;
use crate::output::{
    format_relative_time, format_timestamp, print_field, print_section, status_badge,
    TableDisplay,
};

/// Authentication management commands
#[derive(Debug, Args)]
pub struct AuthCommands {
    #[command(subcommand)]
    pub command: AuthSubcommand,
}

#[derive(Debug, Subcommand)]
pub enum AuthSubcommand {
    /// Log in with a username or email
    Login {
        /// Username or email (prompted when omitted)
        #[arg(short, long)]
        username: Option<String>,

        /// Password (prompted when omitted)
        #[arg(long)]
        password: Option<String>,
    },

    /// Create an account and log in
    Register {
        #[arg(short, long)]
        username: String,

        #[arg(short, long)]
        email: String,

        /// Password (prompted when omitted)
        #[arg(long)]
        password: Option<String>,

        /// Display name, defaults to the username
        #[arg(short, long)]
        name: Option<String>,
    },

    /// End the current session
    Logout,

    /// Show who is logged in
    Status,

    /// List all users (admin)
    Users,

    /// Add a user with the default password (admin)
    AddUser {
        #[arg(short, long)]
        username: String,

        #[arg(short, long)]
        email: String,

        #[arg(short, long)]
        name: String,

        /// Give the account the admin role
        #[arg(long)]
        admin: bool,
    },

    /// Update a user's profile fields
    UpdateUser {
        /// User ID
        id: i64,

        #[arg(short, long)]
        name: Option<String>,

        #[arg(short, long)]
        email: Option<String>,

        #[arg(long)]
        password: Option<String>,

        /// New role, admin or user (admin only)
        #[arg(long)]
        role: Option<String>,
    },

    /// Activate or deactivate a user (admin)
    ToggleUser {
        /// User ID
        id: i64,
    },

    /// Delete a user (admin)
    DeleteUser {
        /// User ID
        id: i64,

        /// Skip confirmation
        #[arg(short, long)]
        force: bool,
    },
}

/// Execute authentication commands
pub async fn execute(ctx: &Context, cmd: AuthCommands) -> Result<()> {
    match cmd.command {
        AuthSubcommand::Login { username, password } => login(ctx, username, password).await,
        AuthSubcommand::Register {
            username,
            email,
            password,
            name,
        } => register(ctx, username, email, password, name).await,
        AuthSubcommand::Logout => logout(ctx).await,
        AuthSubcommand::Status => status(ctx).await,
        AuthSubcommand::Users => list_users(ctx).await,
        AuthSubcommand::AddUser {
            username,
            email,
            name,
            admin,
        } => add_user(ctx, username, email, name, admin).await,
        AuthSubcommand::UpdateUser {
            id,
            name,
            email,
            password,
            role,
        } => update_user(ctx, id, name, email, password, role).await,
        AuthSubcommand::ToggleUser { id } => toggle_user(ctx, id).await,
        AuthSubcommand::DeleteUser { id, force } => delete_user(ctx, id, force).await,
    }
}

impl TableDisplay for SessionUser {
    fn to_row(&self) -> Vec<Cell> {
        vec![
            Cell::new(self.id),
            Cell::new(&self.username),
            Cell::new(&self.name),
            Cell::new(&self.email),
            Cell::new(self.role),
            Cell::new(status_badge(&self.status.to_string())),
            Cell::new(
                self.last_login
                    .as_ref()
                    .map(format_relative_time)
                    .unwrap_or_else(|| "never".to_string()),
            ),
        ]
    }

    fn display_single(&self) {
        print_section("User");
        print_field("ID", &self.id.to_string());
        print_field("Username", &self.username);
        print_field("Name", &self.name);
        print_field("Email", &self.email);
        print_field("Role", &self.role.to_string());
        print_field("Status", &status_badge(&self.status.to_string()));
        print_field("Avatar", &self.avatar);
        print_field("Created", &format_timestamp(&self.created_at));
        if let Some(last) = &self.last_login {
            print_field("Last login", &format_timestamp(last));
        }
    }

    fn display_compact(&self) {
        println!(
            "{}\t{}\t{}\t{}",
            self.id, self.username, self.role, self.status
        );
    }
}

fn prompt_password(given: Option<String>) -> Result<String> {
    match given {
        Some(p) => Ok(p),
        None => Password::new()
            .with_prompt("Password")
            .interact()
            .context("Failed to read password"),
    }
}

fn parse_role(raw: &str) -> Result<Role> {
    match raw.to_ascii_lowercase().as_str() {
        "admin" => Ok(Role::Admin),
        "user" => Ok(Role::User),
        other => anyhow::bail!("Unknown role: {} (expected admin or user)", other),
    }
}

async fn login(ctx: &Context, username: Option<String>, password: Option<String>) -> Result<()> {
    let store = ctx.auth_store().await?;

    if let GuardOutcome::Redirect(_) = store.require_guest().await? {
        if let Some(current) = store.current_user().await {
            ctx.output.warning(&format!(
                "Replacing the session of '{}'",
                current.username
            ));
        }
    }

    let username = match username {
        Some(u) => u,
        None => Input::<String>::new()
            .with_prompt("Username or email")
            .interact_text()
            .context("Failed to read username")?,
    };
    let password = prompt_password(password)?;

    let spinner = ctx.output.spinner("Logging in...");
    let result = store.login(LoginRequest::new(username, password)).await;
    crate::output::finish(spinner);

    let user = result?;
    ctx.output
        .success(&format!("Logged in as {} ({})", user.username, user.role));
    ctx.output.write(&user)?;
    Ok(())
}

async fn register(
    ctx: &Context,
    username: String,
    email: String,
    password: Option<String>,
    name: Option<String>,
) -> Result<()> {
    let store = ctx.auth_store().await?;
    let password = prompt_password(password)?;

    let mut request = RegisterRequest::new(username, email, password);
    if let Some(n) = name {
        request = request.with_name(n);
    }

    let user = store.register(request).await?;
    ctx.output
        .success(&format!("Registered and logged in as {}", user.username));
    ctx.output.write(&user)?;
    Ok(())
}

async fn logout(ctx: &Context) -> Result<()> {
    let store = ctx.auth_store().await?;
    let was = store.current_user().await;
    store.logout().await?;

    match was {
        Some(user) => ctx.output.success(&format!("Logged out {}", user.username)),
        None => ctx.output.info("No active session"),
    }
    Ok(())
}

async fn status(ctx: &Context) -> Result<()> {
    let store = ctx.auth_store().await?;

    match store.require_auth().await? {
        GuardOutcome::Proceed => {
            if let Some(user) = store.current_user().await {
                ctx.output.write(&user)?;
            }
        }
        GuardOutcome::Redirect(_) => {
            ctx.output
                .info("Not logged in. Run 'stock-dashboard auth login' to start a session.");
        }
    }
    Ok(())
}

async fn list_users(ctx: &Context) -> Result<()> {
    let (store, _) = ctx.require_login().await?;
    let users = store.all_users().await?;
    ctx.output.write_list(
        &users,
        &["ID", "Username", "Name", "Email", "Role", "Status", "Last login"],
    )
}

async fn add_user(
    ctx: &Context,
    username: String,
    email: String,
    name: String,
    admin: bool,
) -> Result<()> {
    let (store, _) = ctx.require_login().await?;

    let mut new_user = NewUser::new(username, email, name);
    if admin {
        new_user = new_user.with_role(Role::Admin);
    }

    let user = store.add_user(new_user).await?;
    ctx.output.success(&format!(
        "Added user {} with the default password",
        user.username
    ));
    ctx.output.write(&user)?;
    Ok(())
}

async fn update_user(
    ctx: &Context,
    id: i64,
    name: Option<String>,
    email: Option<String>,
    password: Option<String>,
    role: Option<String>,
) -> Result<()> {
    let (store, _) = ctx.require_login().await?;

    let mut updates = UserUpdate::new();
    if let Some(n) = name {
        updates = updates.with_name(n);
    }
    if let Some(e) = email {
        updates = updates.with_email(e);
    }
    if let Some(p) = password {
        updates = updates.with_password(p);
    }
    if let Some(r) = role {
        updates = updates.with_role(parse_role(&r)?);
    }

    let user = store.update_user(UserId(id), updates).await?;
    ctx.output.success(&format!("Updated user {}", user.username));
    ctx.output.write(&user)?;
    Ok(())
}

async fn toggle_user(ctx: &Context, id: i64) -> Result<()> {
    let (store, _) = ctx.require_login().await?;
    let user = store.toggle_user_status(UserId(id)).await?;
    ctx.output
        .success(&format!("User {} is now {}", user.username, user.status));
    Ok(())
}

async fn delete_user(ctx: &Context, id: i64, force: bool) -> Result<()> {
    let (store, _) = ctx.require_login().await?;

    if !force {
        let confirm = Confirm::new()
            .with_prompt(format!("Delete user {}?", id))
            .default(false)
            .interact()
            .context("Failed to get confirmation")?;

        if !confirm {
            ctx.output.info("Cancelled");
            return Ok(());
        }
    }

    store.delete_user(UserId(id)).await?;
    ctx.output.success(&format!("Deleted user {}", id));
    Ok(())
}
