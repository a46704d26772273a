//! Slash command registration and handling.

use serenity::all::{
    Command, CommandInteraction, Context, CreateCommand, EditInteractionResponse, GuildId,
    Permissions, RoleId as DiscordRoleId,
};
use tracing::{error, info, warn};

use codewarden::event::{ChannelId, RoleId};
use codewarden::moderation::CleanupSweep;

pub const CLEANUP: &str = "cleanup";

const UNAUTHORIZED: &str = "❌ You are not allowed to run a cleanup.";

pub fn create_commands() -> Vec<CreateCommand> {
    vec![
        CreateCommand::new(CLEANUP)
            .description("Delete human messages from the last day in this channel")
            .default_member_permissions(Permissions::MANAGE_MESSAGES),
    ]
}

/// Register commands in one guild when configured (visible immediately),
/// otherwise globally.
pub async fn register(ctx: &Context, guild: Option<u64>) {
    match guild {
        Some(id) => match GuildId::new(id).set_commands(&ctx.http, create_commands()).await {
            Ok(cmds) => info!(guild = id, count = cmds.len(), "Registered guild commands"),
            Err(e) => error!(guild = id, error = %e, "Failed to register guild commands"),
        },
        None => {
            for command in create_commands() {
                match Command::create_global_command(&ctx.http, command).await {
                    Ok(cmd) => info!(command = %cmd.name, "Registered global command"),
                    Err(e) => error!(error = %e, "Failed to register command"),
                }
            }
        }
    }
}

fn member_roles(roles: &[DiscordRoleId]) -> Vec<RoleId> {
    roles.iter().map(|r| RoleId(r.get())).collect()
}

/// Run `/cleanup` in the invoking channel and report back privately.
pub async fn handle_cleanup(ctx: &Context, command: &CommandInteraction, sweep: &CleanupSweep) {
    let roles = command
        .member
        .as_ref()
        .map(|m| member_roles(&m.roles))
        .unwrap_or_default();

    if let Err(e) = command.defer_ephemeral(&ctx.http).await {
        error!(error = %e, "Failed to acknowledge cleanup command");
        return;
    }

    let report = if sweep.is_authorized(&roles) {
        info!(user = %command.user.id, channel = %command.channel_id, "Manual cleanup requested");
        sweep
            .run_manual(ChannelId(command.channel_id.get()))
            .await
    } else {
        warn!(user = %command.user.id, "Unauthorized cleanup attempt");
        UNAUTHORIZED.to_string()
    };

    if let Err(e) = command
        .edit_response(&ctx.http, EditInteractionResponse::new().content(report))
        .await
    {
        error!(error = %e, "Failed to send cleanup report");
    }
}
