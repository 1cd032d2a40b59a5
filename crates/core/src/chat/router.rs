use thiserror::Error;
use tracing::debug;

use super::ChatTarget;
use crate::{capability::Directory, error::StoreError, models::PlayerId};

/// Why a message could not be routed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouteError {
    /// Direct-message username did not resolve.
    #[error("no player named '{0}'")]
    UnknownRecipient(String),
    /// Direct message addressed to the sender.
    #[error("direct messages to yourself are not delivered")]
    SelfAddressed,
    /// The directory lookup itself failed.
    #[error(transparent)]
    Directory(#[from] StoreError),
}

/// Resolve who receives a message right now.
///
/// Membership is looked up at send time and never stored in the message, so
/// later membership changes do not affect lines already sent. The sender is
/// excluded; the session echoes its own lines locally.
pub async fn resolve_recipients(
    directory: &dyn Directory,
    sender: PlayerId,
    target: &ChatTarget,
) -> Result<Vec<PlayerId>, RouteError> {
    let mut recipients = match target {
        ChatTarget::Everyone => directory.online_players().await?,
        ChatTarget::System(system) => directory.players_in_system(*system).await?,
        ChatTarget::Faction(faction) => {
            let mut members = Vec::new();
            for player in directory.online_players().await? {
                if directory.get_player_faction(player).await?.as_ref() == Some(faction) {
                    members.push(player);
                }
            }
            members
        }
        ChatTarget::User(name) => match directory.resolve_username(name).await? {
            Some(player) if player == sender => return Err(RouteError::SelfAddressed),
            Some(player) => vec![player],
            None => return Err(RouteError::UnknownRecipient(name.clone())),
        },
    };
    recipients.retain(|player| *player != sender);
    recipients.sort();
    recipients.dedup();
    debug!(?target, count = recipients.len(), "Chat recipients resolved");
    Ok(recipients)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::{MemoryWorld, Operation, WorldSnapshot};
    use chrono::Utc;

    fn world() -> MemoryWorld {
        MemoryWorld::new(WorldSnapshot::demo("pilot", Utc::now()))
    }

    fn id(world: &MemoryWorld, name: &str) -> PlayerId {
        world.player_named(name).unwrap().id
    }

    #[tokio::test]
    async fn system_channel_reaches_co_located_players_only() {
        let world = world();
        let pilot = id(&world, "pilot");
        let recipients = resolve_recipients(&world, pilot, &ChatTarget::System(1))
            .await
            .unwrap();
        let mut expected = vec![id(&world, "vega"), id(&world, "lyra")];
        expected.sort();
        assert_eq!(recipients, expected);
    }

    #[tokio::test]
    async fn faction_membership_is_read_at_send_time() {
        let world = world();
        let pilot = id(&world, "pilot");
        let vega = id(&world, "vega");
        let target = ChatTarget::Faction("federation".into());
        assert_eq!(
            resolve_recipients(&world, pilot, &target).await.unwrap(),
            vec![vega]
        );
        world.set_online(vega, false);
        assert!(resolve_recipients(&world, pilot, &target)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn direct_message_to_self_is_refused() {
        let world = world();
        let pilot = id(&world, "pilot");
        let err = resolve_recipients(&world, pilot, &ChatTarget::User("Pilot".into()))
            .await
            .unwrap_err();
        assert_eq!(err, RouteError::SelfAddressed);
    }

    #[tokio::test]
    async fn unknown_username_is_a_routing_error() {
        let world = world();
        let pilot = id(&world, "pilot");
        let err = resolve_recipients(&world, pilot, &ChatTarget::User("ghost".into()))
            .await
            .unwrap_err();
        assert_eq!(err, RouteError::UnknownRecipient("ghost".into()));
    }

    #[tokio::test]
    async fn directory_failures_pass_through() {
        let world = world();
        let pilot = id(&world, "pilot");
        world.fail_next(Operation::Directory, StoreError::Unavailable("presence".into()));
        let err = resolve_recipients(&world, pilot, &ChatTarget::Everyone)
            .await
            .unwrap_err();
        assert!(matches!(err, RouteError::Directory(StoreError::Unavailable(_))));
    }
}
