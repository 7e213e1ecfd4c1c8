//! Read access to prompts based on visibility and ownership.

use crate::error::Result;
use crate::models::{Prompt, PromptWithStats, User, Visibility};
use crate::routes::{LOGIN_PATH, SIGNUP_PATH};

/// Whether a viewer may read a prompt with the given visibility.
///
/// Ownership only counts for an authenticated viewer: an anonymous caller is
/// never the owner, whatever `is_owner` says.
pub fn can_access(visibility: Visibility, is_authenticated: bool, is_owner: bool) -> bool {
    match visibility {
        Visibility::Public => true,
        Visibility::Internal => is_authenticated,
        Visibility::Private => is_authenticated && is_owner,
    }
}

/// [`can_access`] for a raw visibility value. Unknown values are an error.
pub fn can_access_str(visibility: &str, is_authenticated: bool, is_owner: bool) -> Result<bool> {
    let visibility = visibility.parse::<Visibility>()?;
    Ok(can_access(visibility, is_authenticated, is_owner))
}

/// The party whose access is being decided.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Viewer {
    pub authenticated: bool,
    pub user_id: Option<i64>,
}

impl Viewer {
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// Signed in, identity not verified yet.
    pub fn signed_in() -> Self {
        Self {
            authenticated: true,
            user_id: None,
        }
    }

    /// Signed in as a user confirmed by the backend.
    pub fn user(user: &User) -> Self {
        Self {
            authenticated: true,
            user_id: Some(user.id),
        }
    }

    pub fn is_owner(&self, prompt: &Prompt) -> bool {
        self.authenticated && self.user_id == Some(prompt.user_id)
    }

    pub fn can_read(&self, prompt: &Prompt) -> bool {
        can_access(prompt.visibility, self.authenticated, self.is_owner(prompt))
    }
}

/// Call to action shown instead of a prompt the viewer may not read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockedNotice {
    pub visibility: Visibility,
    pub title: &'static str,
    pub message: &'static str,
    pub login_path: &'static str,
    pub signup_path: &'static str,
}

impl LockedNotice {
    pub fn for_visibility(visibility: Visibility) -> Self {
        let (title, message) = match visibility {
            Visibility::Internal => (
                "Internal Content",
                "This content is only available to signed-in users. Please log in to view it.",
            ),
            _ => (
                "Private Content",
                "This content is private and only available to the owner. If this is your prompt, please log in to view it.",
            ),
        };
        Self {
            visibility,
            title,
            message,
            login_path: LOGIN_PATH,
            signup_path: SIGNUP_PATH,
        }
    }
}

/// What a prompt detail page shows to a given viewer.
#[derive(Debug, Clone)]
pub enum PromptPage {
    Visible {
        prompt: Box<PromptWithStats>,
        /// Signed-in viewers with access get a link to the management page.
        can_manage: bool,
    },
    /// Holds no part of the prompt beyond its visibility.
    Locked(LockedNotice),
}

impl PromptPage {
    pub fn resolve(prompt: PromptWithStats, viewer: &Viewer) -> Self {
        if viewer.can_read(&prompt.prompt) {
            PromptPage::Visible {
                can_manage: viewer.authenticated,
                prompt: Box::new(prompt),
            }
        } else {
            tracing::debug!(
                "Prompt {} is {} and hidden from this viewer",
                prompt.prompt.id,
                prompt.prompt.visibility
            );
            PromptPage::Locked(LockedNotice::for_visibility(prompt.prompt.visibility))
        }
    }

    pub fn is_locked(&self) -> bool {
        matches!(self, PromptPage::Locked(_))
    }
}
