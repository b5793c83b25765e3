use anyhow::Context;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{
    github_ext::users::UserExt,
    resource::{DataSource, ProviderData},
    schema::{Attribute, Kind, Schema},
};

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct UserDataModel {
    pub username: String,
    pub login: Option<String>,
    pub name: Option<String>,
    pub company: Option<String>,
    pub blog: Option<String>,
    pub location: Option<String>,
    pub email: Option<String>,
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
    pub node_id: Option<String>,
    pub public_repos: Option<u64>,
    pub followers: Option<u64>,
    pub following: Option<u64>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
    pub id: Option<String>,
}

pub struct UserDataSource;

#[async_trait]
impl DataSource for UserDataSource {
    type Model = UserDataModel;

    const TYPE_NAME: &'static str = "github_user";

    fn schema(&self) -> Schema {
        let mut schema = Schema::new("Looks up a user's public profile.").attr("username", Attribute::required_string());
        for attr in [
            "login",
            "name",
            "company",
            "blog",
            "location",
            "email",
            "bio",
            "avatar_url",
            "node_id",
        ] {
            schema = schema.attr(attr, Attribute::computed_string());
        }
        for attr in ["public_repos", "followers", "following"] {
            schema = schema.attr(attr, Attribute::computed(Kind::Int));
        }
        schema
            .attr("created_at", Attribute::computed_string())
            .attr("updated_at", Attribute::computed_string())
            .attr("id", Attribute::computed_string())
    }

    async fn read(&self, data: &ProviderData, config: UserDataModel) -> anyhow::Result<UserDataModel> {
        let user = data
            .client
            .get_user(&config.username)
            .await
            .with_context(|| format!("Failed to read user {}", config.username))?;

        Ok(UserDataModel {
            id: Some(user.id.to_string()),
            login: Some(user.login),
            name: user.name,
            company: user.company,
            blog: user.blog,
            location: user.location,
            email: user.email,
            bio: user.bio,
            avatar_url: Some(user.avatar_url),
            node_id: Some(user.node_id),
            public_repos: Some(user.public_repos),
            followers: Some(user.followers),
            following: Some(user.following),
            created_at: Some(user.created_at),
            updated_at: Some(user.updated_at),
            ..config
        })
    }
}
