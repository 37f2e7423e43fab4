//! The signed-in user's own profile.

use murmur_proto::{Author, AuthorId, AuthorPatch, PresenceStatus};

/// Profile of the session user.
///
/// Author updates for the session's own id are copied here so the profile
/// stays current without a separate fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionUser {
    /// Session user's author id
    pub id: AuthorId,
    /// Login name
    pub username: String,
    /// Presence status
    pub status: PresenceStatus,
    /// Display colors
    pub colors: Vec<String>,
    /// Profile text
    pub bio: Option<String>,
    /// Cumulative bytes sent
    pub byte_count: u64,
    /// Account email. Only known to the session, never carried by author
    /// updates.
    pub email: Option<String>,
}

impl SessionUser {
    /// Session profile seeded from an author record.
    pub fn from_author(author: &Author) -> Self {
        Self {
            id: author.id.clone(),
            username: author.username.clone(),
            status: author.status,
            colors: author.colors.clone(),
            bio: author.bio.clone(),
            byte_count: author.byte_count,
            email: None,
        }
    }

    /// Copy the author fields shared with the session profile.
    ///
    /// Returns true if anything changed. Records for other ids are ignored.
    pub fn merge_author(&mut self, author: &Author) -> bool {
        if author.id != self.id {
            return false;
        }
        let before = self.clone();
        self.username.clone_from(&author.username);
        self.status = author.status;
        self.colors.clone_from(&author.colors);
        self.bio.clone_from(&author.bio);
        self.byte_count = author.byte_count;
        *self != before
    }

    /// Apply the fields a partial author update carries.
    ///
    /// Returns true if anything changed. Patches for other ids are ignored.
    pub fn merge_patch(&mut self, patch: &AuthorPatch) -> bool {
        if patch.id != self.id {
            return false;
        }
        let mut author = self.as_author();
        author.apply(patch);
        self.merge_author(&author)
    }

    fn as_author(&self) -> Author {
        Author {
            id: self.id.clone(),
            username: self.username.clone(),
            status: self.status,
            colors: self.colors.clone(),
            bio: self.bio.clone(),
            byte_count: self.byte_count,
        }
    }
}
