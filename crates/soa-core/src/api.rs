//! Shared types for the compliance API: tasks, attachments, comments, people, context.
//!
//! Field names follow the API's camelCase JSON.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Todo,
    InProgress,
    Done,
    Blocked,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub status: TaskStatus,
    /// ISO 8601 timestamp string.
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    pub id: String,
    pub entity_id: String,
    pub entity_type: String,
    pub file_name: String,
    pub file_type: String,
    pub file_size: u64,
    pub created_at: String,
    pub created_by: String,
    #[serde(default)]
    pub download_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadAttachmentRequest {
    pub file_name: String,
    /// MIME type, e.g. `application/pdf`.
    pub file_type: String,
    /// Base64-encoded file content.
    pub file_data: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub created_by: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentAuthor {
    pub id: String,
    pub name: String,
    pub email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentAttachment {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub download_url: String,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: String,
    pub content: String,
    pub author: CommentAuthor,
    #[serde(default)]
    pub attachments: Vec<CommentAttachment>,
    pub created_at: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityType {
    Task,
    Vendor,
    Risk,
    Policy,
}

impl EntityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Task => "task",
            Self::Vendor => "vendor",
            Self::Risk => "risk",
            Self::Policy => "policy",
        }
    }
}

impl std::str::FromStr for EntityType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "task" => Ok(Self::Task),
            "vendor" => Ok(Self::Vendor),
            "risk" => Ok(Self::Risk),
            "policy" => Ok(Self::Policy),
            other => Err(format!(
                "unknown entity type '{other}' (expected task, vendor, risk or policy)"
            )),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCommentAttachment {
    pub file_name: String,
    pub file_type: String,
    /// Base64-encoded file content.
    pub file_data: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCommentRequest {
    pub content: String,
    pub entity_id: String,
    pub entity_type: EntityType,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<NewCommentAttachment>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    pub email_verified: bool,
    #[serde(default)]
    pub image: Option<String>,
    pub created_at: String,
    pub updated_at: String,
    #[serde(default)]
    pub last_login: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemberRole {
    Admin,
    Member,
    Viewer,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Member {
    pub id: String,
    pub organization_id: String,
    pub user_id: String,
    pub role: MemberRole,
    pub created_at: String,
    #[serde(default)]
    pub department: Option<String>,
    pub is_active: bool,
    #[serde(default)]
    pub fleet_dm_label_id: Option<i64>,
    pub user: User,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthenticatedUser {
    pub id: String,
    pub email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeopleResponse {
    pub data: Vec<Member>,
    pub count: u64,
    pub auth_type: String,
    #[serde(default)]
    pub authenticated_user: Option<AuthenticatedUser>,
}

/// A question/answer pair describing an organisational fact, used as LLM input.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextEntry {
    pub id: String,
    pub organization_id: String,
    pub question: String,
    pub answer: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextResponse {
    pub data: Vec<ContextEntry>,
    pub count: u64,
    pub auth_type: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_status_snake_case() {
        let json = r#"{
            "id": "tsk_1",
            "title": "Security audit",
            "status": "in_progress",
            "createdAt": "2024-01-19T16:00:00Z",
            "updatedAt": "2024-01-19T16:00:00Z"
        }"#;
        let task: Task = serde_json::from_str(json).unwrap();
        assert_eq!(task.status, TaskStatus::InProgress);
        assert!(task.description.is_none());
    }

    #[test]
    fn context_response_parses_without_tags() {
        let json = r#"{
            "data": [{
                "id": "ctx_1",
                "organizationId": "org_1",
                "question": "Where is data hosted?",
                "answer": "AWS eu-west-2",
                "createdAt": "2024-01-01T00:00:00Z",
                "updatedAt": "2024-01-01T00:00:00Z"
            }],
            "count": 1,
            "authType": "api-key"
        }"#;
        let parsed: ContextResponse = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.count, 1);
        assert_eq!(parsed.data[0].answer, "AWS eu-west-2");
        assert!(parsed.data[0].tags.is_empty());
    }

    #[test]
    fn create_comment_omits_empty_attachments() {
        let req = CreateCommentRequest {
            content: "Evidence uploaded".into(),
            entity_id: "tsk_1".into(),
            entity_type: EntityType::Task,
            attachments: vec![],
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["entityType"], "task");
        assert_eq!(json["entityId"], "tsk_1");
        assert!(json.get("attachments").is_none());
    }

    #[test]
    fn entity_type_from_str() {
        assert_eq!("Vendor".parse::<EntityType>(), Ok(EntityType::Vendor));
        assert!("control".parse::<EntityType>().is_err());
    }

    #[test]
    fn comment_attachment_type_field() {
        let json = r#"{
            "id": "cmt_1",
            "content": "See attached",
            "author": {"id": "usr_1", "name": "Sam", "email": "sam@example.com"},
            "attachments": [{
                "id": "att_1",
                "name": "policy.pdf",
                "type": "application/pdf",
                "downloadUrl": "https://files.example.com/att_1",
                "createdAt": "2024-01-01T00:00:00Z"
            }],
            "createdAt": "2024-01-01T00:00:00Z"
        }"#;
        let c: Comment = serde_json::from_str(json).unwrap();
        assert_eq!(c.attachments[0].kind, "application/pdf");
    }
}
