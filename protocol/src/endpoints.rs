use {
    crate::{OpaqueId, RequestPath},
    serde::{Deserialize, Serialize},
};

pub trait Endpoint {
    const PATH: &'static str;
}
macro_rules! endpoint {
    ($request:ty, $path:literal) => {
        impl Endpoint for $request {
            const PATH: &'static str = concat!("/api/", $path);
        }
    };
}

/// Lists the children of a folder, or describes a single file.
///
/// Sent as `GET /api/ls?path=/a/b`.
#[derive(Debug, Serialize, Deserialize)]
pub struct ListPath {
    pub path: RequestPath,
}
/// Answered with a [`Listing`].
endpoint!(ListPath, "ls");

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Listing {
    pub path: RequestPath,
    /// Opaque id of the listed folder; `None` for the root folder.
    pub folder: Option<OpaqueId>,
    pub entries: Vec<ListedEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListedEntry {
    pub id: OpaqueId,
    pub name: String,
    pub mime_type: String,
    pub is_folder: bool,
    /// Token-carrying link, present for files only.
    pub download_url: Option<String>,
}

/// Remembers a password in the client's cookies.
///
/// With `folder == None` the site-wide password is set.
#[derive(Debug, Serialize, Deserialize)]
pub struct SetPassword {
    pub folder: Option<OpaqueId>,
    pub password: String,
}
endpoint!(SetPassword, "password");

/// Forgets every remembered password.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ClearPasswords {}
endpoint!(ClearPasswords, "logout");

/// Prefix of `GET /api/download/<opaque id>?token=<token>`.
pub const DOWNLOAD_PATH: &str = "/api/download/";
pub const HEALTH_PATH: &str = "/api/health";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "folder")]
pub enum PromptTarget {
    Site,
    Folder(OpaqueId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromptReason {
    Required,
    Incorrect,
}

/// Tells the client which password to ask for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prompt {
    pub target: PromptTarget,
    pub reason: PromptReason,
}

impl Prompt {
    #[must_use]
    #[inline]
    pub fn folder(folder: OpaqueId, reason: PromptReason) -> Self {
        Self {
            target: PromptTarget::Folder(folder),
            reason,
        }
    }

    #[must_use]
    #[inline]
    pub fn site(reason: PromptReason) -> Self {
        Self {
            target: PromptTarget::Site,
            reason,
        }
    }

}

/// Body of every non-2xx JSON response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<Prompt>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths() {
        assert_eq!(ListPath::PATH, "/api/ls");
        assert_eq!(SetPassword::PATH, "/api/password");
        assert_eq!(ClearPasswords::PATH, "/api/logout");
    }

    #[test]
    fn prompt_json() {
        let prompt = Prompt::folder("abc".into(), PromptReason::Incorrect);
        assert_eq!(
            serde_json::to_string(&prompt).unwrap(),
            r#"{"target":{"kind":"folder","folder":"abc"},"reason":"incorrect"}"#
        );
        let prompt = Prompt::site(PromptReason::Required);
        assert_eq!(
            serde_json::to_string(&prompt).unwrap(),
            r#"{"target":{"kind":"site"},"reason":"required"}"#
        );
    }

    #[test]
    fn set_password_body() {
        let request: SetPassword =
            serde_json::from_str(r#"{"folder":null,"password":"hunter2"}"#).unwrap();
        assert_eq!(request.folder, None);
        assert_eq!(request.password, "hunter2");
    }
}
