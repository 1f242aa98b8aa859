use serde::Serialize;

use crate::storage::BlobStore;

#[derive(Debug, Clone)]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub profile_photo: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Public shape of a user. The password hash never leaves the store.
#[derive(Debug, Clone, Serialize)]
pub struct UserView {
    pub id: String,
    pub name: String,
    pub email: String,
    pub profile_photo_url: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl User {
    pub fn view(&self, blobs: &dyn BlobStore) -> UserView {
        UserView {
            id: self.id.clone(),
            name: self.name.clone(),
            email: self.email.clone(),
            profile_photo_url: self.profile_photo.as_deref().map(|k| blobs.url(k)),
            created_at: self.created_at.clone(),
            updated_at: self.updated_at.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Post {
    pub id: String,
    pub user_id: String,
    pub content: String,
    pub media_path: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PostView {
    pub id: String,
    pub user_id: String,
    pub content: String,
    pub media_url: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl Post {
    pub fn view(&self, blobs: &dyn BlobStore) -> PostView {
        PostView {
            id: self.id.clone(),
            user_id: self.user_id.clone(),
            content: self.content.clone(),
            media_url: self.media_path.as_deref().map(|k| blobs.url(k)),
            created_at: self.created_at.clone(),
            updated_at: self.updated_at.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Comment {
    pub id: String,
    pub post_id: String,
    pub user_id: String,
    pub comment_text: String,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Reaction {
    pub id: String,
    pub post_id: String,
    pub user_id: String,
    pub is_like: bool,
    pub created_at: String,
    pub updated_at: String,
}
