use super::*;
use crate::error::{ApiError, ApiResult};
use crate::store::get_typed;
use crate::types::{GameRoom, RoomAccess, ValidateRoomPayload};
use serde_json::Value;
use std::str::FromStr;

pub const ROOMS_COLLECTION: &str = "game_rooms";

/// Operations a client may ask permission for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoomOperation {
    Join,
    Update,
    SubmitAnswer,
    SendMessage,
    Delete,
    StartGame,
    EndGame,
}

impl RoomOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            RoomOperation::Join => "join",
            RoomOperation::Update => "update",
            RoomOperation::SubmitAnswer => "submit_answer",
            RoomOperation::SendMessage => "send_message",
            RoomOperation::Delete => "delete",
            RoomOperation::StartGame => "start_game",
            RoomOperation::EndGame => "end_game",
        }
    }
}

impl FromStr for RoomOperation {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "join" => Ok(RoomOperation::Join),
            "update" => Ok(RoomOperation::Update),
            "submit_answer" => Ok(RoomOperation::SubmitAnswer),
            "send_message" => Ok(RoomOperation::SendMessage),
            "delete" => Ok(RoomOperation::Delete),
            "start_game" => Ok(RoomOperation::StartGame),
            "end_game" => Ok(RoomOperation::EndGame),
            other => Err(ApiError::invalid_argument(format!(
                "Unknown operation: {}",
                other
            ))),
        }
    }
}

fn required_str<'a>(value: &'a Value, message: &str) -> ApiResult<&'a str> {
    value
        .as_str()
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ApiError::invalid_argument(message))
}

/// Decide whether `user_id` may perform `operation` on `room`.
///
/// | operation | allowed when |
/// |---|---|
/// | join | room is waiting and below capacity |
/// | update, submit_answer, send_message | caller is a player or the host |
/// | delete, start_game, end_game | caller is the host |
pub fn authorize_operation(
    user_id: &str,
    room: &GameRoom,
    operation: RoomOperation,
) -> ApiResult<RoomAccess> {
    let is_host = room.host_id.as_deref() == Some(user_id);
    let is_player = room.has_player(user_id);

    match operation {
        RoomOperation::Join => {
            if !room.is_waiting() {
                return Err(ApiError::permission_denied(
                    "Room is not accepting new players",
                ));
            }
            if room.players.len() >= room.capacity() {
                return Err(ApiError::permission_denied("Room is full"));
            }
        }
        RoomOperation::Update | RoomOperation::SubmitAnswer | RoomOperation::SendMessage => {
            if !is_player && !is_host {
                return Err(ApiError::permission_denied(
                    "You are not a member of this room",
                ));
            }
        }
        RoomOperation::Delete | RoomOperation::StartGame | RoomOperation::EndGame => {
            if !is_host {
                return Err(ApiError::permission_denied(
                    "Only the room host can perform this operation",
                ));
            }
        }
    }

    Ok(RoomAccess {
        success: true,
        is_host,
        is_player,
        room_status: room.status.clone(),
    })
}

impl AppState {
    /// Check a room operation for the caller. Read-only: the room document is
    /// never written.
    pub async fn validate_room(
        &self,
        caller: Option<&str>,
        payload: &ValidateRoomPayload,
    ) -> ApiResult<RoomAccess> {
        let user_id = caller.ok_or(ApiError::Unauthenticated)?;
        let room_id = required_str(&payload.room_id, "Room ID is required")?;
        let operation = required_str(&payload.operation, "Operation type is required")?;

        let room: GameRoom = get_typed(self.store.as_ref(), ROOMS_COLLECTION, room_id)
            .await?
            .ok_or_else(|| ApiError::NotFound("Room does not exist".to_string()))?;
        let operation: RoomOperation = operation.parse()?;

        authorize_operation(user_id, &room, operation).inspect_err(|e| {
            tracing::warn!(
                user_id,
                room_id,
                operation = operation.as_str(),
                reason = %e,
                "Room operation denied"
            );
        })
    }
}
