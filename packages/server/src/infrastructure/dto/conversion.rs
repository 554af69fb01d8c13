//! Conversion logic from domain entities to HTTP DTOs.

use rendezvous_shared::time::timestamp_to_jst_rfc3339;

use crate::{
    domain::{Connection, Room},
    infrastructure::dto::http::{MemberDetailDto, RoomDetailDto, RoomSummaryDto},
    usecase::RoomDetail,
};

impl From<Room> for RoomSummaryDto {
    fn from(model: Room) -> Self {
        Self {
            id: model.id.into_string(),
            members: model.members.into_iter().map(|m| m.into_string()).collect(),
            created_at: timestamp_to_jst_rfc3339(model.created_at.value()),
        }
    }
}

impl From<Connection> for MemberDetailDto {
    fn from(model: Connection) -> Self {
        Self {
            peer_id: model.id.into_string(),
            connected_at: timestamp_to_jst_rfc3339(model.connected_at.value()),
        }
    }
}

impl From<RoomDetail> for RoomDetailDto {
    fn from(model: RoomDetail) -> Self {
        Self {
            id: model.room.id.into_string(),
            members: model.members.into_iter().map(Into::into).collect(),
            created_at: timestamp_to_jst_rfc3339(model.room.created_at.value()),
        }
    }
}
