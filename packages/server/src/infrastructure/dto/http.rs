//! HTTP API response DTOs.

use serde::{Deserialize, Serialize};

/// Entry of `GET /api/rooms`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomSummaryDto {
    pub id: String,
    pub members: Vec<String>,
    /// RFC 3339 (JST)
    pub created_at: String,
}

/// Body of `GET /api/rooms/{room_id}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomDetailDto {
    pub id: String,
    pub members: Vec<MemberDetailDto>,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberDetailDto {
    pub peer_id: String,
    pub connected_at: String,
}

/// Body of `GET /api/health`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthDto {
    pub status: String,
    pub connections: usize,
    pub rooms: usize,
}
