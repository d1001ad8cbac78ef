//! Wire types for the Pulse metadata service (JSON:API).

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::api::ProjectId;

/// Upload type label declared when registering an iOS symbol upload.
pub(crate) const UPLOAD_TYPE_IOS: &str = "IOS";

/// Document whose `data` member is a list of resource identifiers.
#[derive(Debug, Deserialize)]
pub(crate) struct IdentifierList {
    pub(crate) data: Vec<Identifier>,
}

/// Document whose `data` member is a single resource identifier.
#[derive(Debug, Deserialize)]
pub(crate) struct IdentifierDocument {
    pub(crate) data: Identifier,
}

/// Resource identifier. JSON:API servers encode ids as either numbers or
/// strings; both are accepted.
#[derive(Debug, Deserialize)]
pub(crate) struct Identifier {
    pub(crate) id: Value,
}

impl Identifier {
    pub(crate) fn as_u64(&self) -> Option<u64> {
        match &self.id {
            Value::Number(number) => number.as_u64(),
            Value::String(text) => text.parse().ok(),
            _ => None,
        }
    }
}

/// Document carrying an upload record's status attributes.
#[derive(Debug, Deserialize)]
pub(crate) struct StatusDocument {
    pub(crate) data: StatusResource,
}

#[derive(Debug, Deserialize)]
pub(crate) struct StatusResource {
    pub(crate) attributes: StatusAttributes,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct StatusAttributes {
    pub(crate) upload_status: String,
    #[serde(default)]
    pub(crate) failure_reason: Option<String>,
}

/// Request document registering a size-declared upload for a project.
#[derive(Debug, Serialize)]
pub(crate) struct CreateUploadDocument {
    pub(crate) data: CreateUploadResource,
}

#[derive(Debug, Serialize)]
pub(crate) struct CreateUploadResource {
    #[serde(rename = "type")]
    pub(crate) kind: &'static str,
    pub(crate) attributes: CreateUploadAttributes,
    pub(crate) relationships: CreateUploadRelationships,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CreateUploadAttributes {
    pub(crate) upload_type: &'static str,
    pub(crate) content_length: u64,
}

#[derive(Debug, Serialize)]
pub(crate) struct CreateUploadRelationships {
    pub(crate) project: CreateUploadProject,
}

#[derive(Debug, Serialize)]
pub(crate) struct CreateUploadProject {
    pub(crate) data: ProjectLinkage,
}

#[derive(Debug, Serialize)]
pub(crate) struct ProjectLinkage {
    pub(crate) id: u64,
    #[serde(rename = "type")]
    pub(crate) kind: &'static str,
}

impl CreateUploadDocument {
    /// Builds the registration document for an iOS symbol upload.
    pub(crate) fn ios(project: ProjectId, content_length: u64) -> Self {
        Self {
            data: CreateUploadResource {
                kind: "upload",
                attributes: CreateUploadAttributes {
                    upload_type: UPLOAD_TYPE_IOS,
                    content_length,
                },
                relationships: CreateUploadRelationships {
                    project: CreateUploadProject {
                        data: ProjectLinkage {
                            id: project.as_u64(),
                            kind: "project",
                        },
                    },
                },
            },
        }
    }
}
