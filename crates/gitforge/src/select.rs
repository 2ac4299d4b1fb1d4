//! Interactive choice of organisations and repositories.

use gitforge_core::{
    repo_full_name, Error, GitProvider, Kind, OrganisationLister, Repository, Result, UserAuth,
};
use tracing::{info, warn};

use crate::factory;
use crate::prompt::{Prompter, Validator};
use crate::resolver::Resolver;

/// Name used for new repositories in batch mode when no default is given.
pub const BATCH_REPOSITORY_NAME: &str = "dummy";

/// The user's own name plus every organisation login, sorted.
///
/// A lister that fails yields just the username.
pub async fn organisation_choices<L>(lister: &L, username: &str) -> Vec<String>
where
    L: OrganisationLister + ?Sized,
{
    let mut names = vec![username.to_string()];
    match lister.list_organisations().await {
        Ok(orgs) => names.extend(
            orgs.into_iter()
                .map(|o| o.login)
                .filter(|login| !login.is_empty()),
        ),
        Err(e) => warn!(error = %e, "Failed to list organisations"),
    }
    names.sort();
    names.dedup();
    names
}

/// Ask which organisation to use. `None` means the user's own account.
pub async fn pick_organisation<L>(
    lister: &L,
    username: &str,
    prompter: &dyn Prompter,
) -> Result<Option<String>>
where
    L: OrganisationLister + ?Sized,
{
    let choices = organisation_choices(lister, username).await;
    let picked = prompter.select_one("Which organisation do you want to use?", &choices, username)?;
    if picked == username {
        Ok(None)
    } else {
        Ok(Some(picked))
    }
}

/// Ask which of `owner`'s repositories to use.
///
/// Names are narrowed to those containing `filter` and shown sorted;
/// `select_all` preselects every entry.
pub async fn pick_repositories(
    provider: &dyn GitProvider,
    owner: &str,
    message: &str,
    select_all: bool,
    filter: &str,
    prompter: &dyn Prompter,
) -> Result<Vec<Repository>> {
    let mut repos: Vec<Repository> = provider
        .list_repositories(owner)
        .await?
        .into_iter()
        .filter(|r| !r.name.is_empty() && (filter.is_empty() || r.name.contains(filter)))
        .collect();
    if repos.is_empty() {
        return Err(Error::NotFound(
            "No matching repositories could be found!".to_string(),
        ));
    }
    repos.sort_by(|a, b| a.name.cmp(&b.name));

    let names: Vec<String> = repos.iter().map(|r| r.name.clone()).collect();
    let picked = prompter.multi_select(message, &names, select_all)?;
    Ok(repos
        .into_iter()
        .filter(|r| picked.contains(&r.name))
        .collect())
}

/// Owner for a new repository: an organisation, or `username` itself.
pub async fn pick_owner(
    batch_mode: bool,
    provider: &dyn GitProvider,
    username: &str,
    prompter: &dyn Prompter,
) -> Result<String> {
    if batch_mode {
        return Ok(username.to_string());
    }
    let org = pick_organisation(provider, username, prompter).await?;
    Ok(org.unwrap_or_else(|| username.to_string()))
}

/// Name for a new repository under `owner`.
///
/// Batch mode takes `default_name` or [`BATCH_REPOSITORY_NAME`]. Otherwise
/// the user is asked until the name is non-blank and, unless
/// `allow_existing`, not already taken.
pub async fn pick_repository_name(
    batch_mode: bool,
    allow_existing: bool,
    provider: &dyn GitProvider,
    default_name: &str,
    owner: &str,
    prompter: &dyn Prompter,
) -> Result<String> {
    if batch_mode {
        if default_name.is_empty() {
            return Ok(BATCH_REPOSITORY_NAME.to_string());
        }
        return Ok(default_name.to_string());
    }

    let not_blank: &Validator = &|value: &str| {
        if value.trim().is_empty() {
            Err("Repository name is required".to_string())
        } else {
            Ok(())
        }
    };
    loop {
        let name = prompter
            .prompt_text("Enter the new repository name:", default_name, not_blank)?
            .trim()
            .to_string();
        if allow_existing {
            return Ok(name);
        }
        match provider.validate_repository_name(owner, &name).await {
            Ok(()) => return Ok(name),
            Err(Error::AlreadyExists(message)) => {
                warn!(owner = owner, name = %name, "{} already exists, pick another name", message);
            }
            Err(e) => return Err(e),
        }
    }
}

/// Inputs for [`pick_new_repository`].
#[derive(Debug, Clone, Default)]
pub struct NewRepositoryOptions {
    /// Server to create on. Empty asks the user to pick a stored server.
    pub server_url: String,
    pub kind: Kind,
    pub username: String,
    /// Together with `username`, a credential to store instead of resolving one.
    pub api_token: String,
    pub default_name: String,
    pub private: bool,
    pub batch_mode: bool,
}

/// Everything needed to create a repository, gathered up front.
pub struct NewRepository {
    /// `None` when the repository belongs to the user's own account.
    pub organisation: Option<String>,
    pub name: String,
    pub full_name: String,
    pub private: bool,
    pub user: UserAuth,
    pub provider: Box<dyn GitProvider>,
}

impl NewRepository {
    pub async fn create(&self) -> Result<Repository> {
        let org = self.organisation.as_deref().unwrap_or_default();
        self.provider
            .create_repository(org, &self.name, self.private)
            .await
    }
}

/// Walk the user through choosing a server, identity, owner and name for
/// a new repository. Nothing is created until [`NewRepository::create`].
pub async fn pick_new_repository(
    resolver: &mut Resolver<'_>,
    options: &NewRepositoryOptions,
) -> Result<NewRepository> {
    let server_url = if options.server_url.is_empty() {
        resolver.pick_server("Which git provider?")?.url
    } else {
        options.server_url.clone()
    };

    let (server, user) = if options.username.is_empty() || options.api_token.is_empty() {
        resolver.resolve_user_auth(
            &server_url,
            options.kind,
            &options.username,
            options.batch_mode,
        )?
    } else {
        let user = UserAuth::new(&options.username, &options.api_token);
        let server = resolver.save_user_auth(&server_url, options.kind, &user)?;
        (server, user)
    };
    info!(server = %server.description(), username = %user.username, "Using git provider");

    let provider = factory::create(server.kind, &server, user.clone())?;
    let prompter = resolver.prompter();
    let owner = pick_owner(options.batch_mode, provider.as_ref(), &user.username, prompter).await?;
    let organisation = (owner != user.username).then(|| owner.clone());
    let name = pick_repository_name(
        options.batch_mode,
        false,
        provider.as_ref(),
        &options.default_name,
        &owner,
        prompter,
    )
    .await?;
    let full_name = repo_full_name(organisation.as_deref().unwrap_or_default(), &name);
    info!(repository = %full_name, "Creating repository");

    Ok(NewRepository {
        organisation,
        name,
        full_name,
        private: options.private,
        user,
        provider,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prompt::MockPrompter;
    use async_trait::async_trait;
    use gitforge_auth::{AuthConfigService, MemoryConfigSaver};
    use gitforge_core::Organisation;
    use gitforge_fake::fixtures::sample_provider;

    struct BrokenLister;

    #[async_trait]
    impl OrganisationLister for BrokenLister {
        async fn list_organisations(&self) -> Result<Vec<Organisation>> {
            Err(Error::Http("connection refused".to_string()))
        }
    }

    #[tokio::test]
    async fn test_organisation_choices() {
        let provider = sample_provider().unwrap();
        assert_eq!(
            organisation_choices(&provider, "alice").await,
            vec!["acme".to_string(), "alice".to_string()]
        );
        assert_eq!(
            organisation_choices(&provider, "zed").await,
            vec!["acme".to_string(), "alice".to_string(), "zed".to_string()]
        );
        assert_eq!(
            organisation_choices(&BrokenLister, "alice").await,
            vec!["alice".to_string()]
        );
    }

    #[tokio::test]
    async fn test_pick_organisation_own_account_is_none() {
        let provider = sample_provider().unwrap();
        let mut prompter = MockPrompter::new();
        prompter
            .expect_select_one()
            .withf(|_, options, default| options.len() == 2 && default == "alice")
            .times(1)
            .returning(|_, _, default| Ok(default.to_string()));
        assert_eq!(
            pick_organisation(&provider, "alice", &prompter).await.unwrap(),
            None
        );

        let mut prompter = MockPrompter::new();
        prompter
            .expect_select_one()
            .returning(|_, _, _| Ok("acme".to_string()));
        assert_eq!(
            pick_organisation(&provider, "alice", &prompter).await.unwrap(),
            Some("acme".to_string())
        );
        assert_eq!(
            pick_owner(false, &provider, "alice", &prompter).await.unwrap(),
            "acme"
        );
    }

    #[tokio::test]
    async fn test_pick_owner_in_batch_mode_never_prompts() {
        let provider = sample_provider().unwrap();
        let prompter = MockPrompter::new();
        assert_eq!(
            pick_owner(true, &provider, "alice", &prompter).await.unwrap(),
            "alice"
        );
    }

    #[tokio::test]
    async fn test_pick_repositories_filters_and_sorts() {
        let provider = sample_provider().unwrap();
        provider.add_repository("acme", "gizmos").unwrap();
        provider.add_repository("acme", "gimbals").unwrap();
        let mut prompter = MockPrompter::new();
        prompter
            .expect_multi_select()
            .withf(|_, options, select_all| {
                options == ["gimbals".to_string(), "gizmos".to_string()] && *select_all
            })
            .times(1)
            .returning(|_, options, _| Ok(options.to_vec()));

        let picked = pick_repositories(&provider, "acme", "Pick", true, "gi", &prompter)
            .await
            .unwrap();
        let names: Vec<_> = picked.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["gimbals", "gizmos"]);
    }

    #[tokio::test]
    async fn test_pick_repositories_without_match() {
        let provider = sample_provider().unwrap();
        let prompter = MockPrompter::new();
        let err = pick_repositories(&provider, "acme", "Pick", false, "nothing", &prompter)
            .await
            .unwrap_err();
        assert!(err
            .to_string()
            .contains("No matching repositories could be found!"));
    }

    #[tokio::test]
    async fn test_pick_repository_name_in_batch_mode() {
        let provider = sample_provider().unwrap();
        let prompter = MockPrompter::new();
        assert_eq!(
            pick_repository_name(true, false, &provider, "", "acme", &prompter)
                .await
                .unwrap(),
            BATCH_REPOSITORY_NAME
        );
        assert_eq!(
            pick_repository_name(true, false, &provider, "widgets", "acme", &prompter)
                .await
                .unwrap(),
            "widgets"
        );
    }

    #[tokio::test]
    async fn test_pick_repository_name_rejects_taken_names() {
        let provider = sample_provider().unwrap();
        let mut answers = vec!["sprockets", "widgets"];
        let mut prompter = MockPrompter::new();
        prompter
            .expect_prompt_text()
            .times(2)
            .returning(move |_, _, validator| {
                assert!(validator(" ").is_err());
                Ok(answers.pop().unwrap_or_default().to_string())
            });

        let name = pick_repository_name(false, false, &provider, "", "acme", &prompter)
            .await
            .unwrap();
        assert_eq!(name, "sprockets");
    }

    #[tokio::test]
    async fn test_new_repository_wizard_in_batch_mode() {
        let mut service = AuthConfigService::new(MemoryConfigSaver::new());
        let prompter = MockPrompter::new();
        let mut resolver = Resolver::new(&mut service, &prompter);
        let options = NewRepositoryOptions {
            server_url: "https://fake.git".to_string(),
            kind: Kind::Fake,
            username: "alice".to_string(),
            api_token: "token".to_string(),
            default_name: "widgets".to_string(),
            batch_mode: true,
            ..Default::default()
        };

        let new_repo = pick_new_repository(&mut resolver, &options).await.unwrap();
        assert_eq!(new_repo.organisation, None);
        assert_eq!(new_repo.full_name, "widgets");
        assert_eq!(new_repo.provider.kind(), Kind::Fake);

        let created = new_repo.create().await.unwrap();
        assert_eq!(created.organisation, "alice");
        assert!(matches!(
            new_repo
                .provider
                .validate_repository_name("alice", "widgets")
                .await,
            Err(Error::AlreadyExists(_))
        ));
        assert_eq!(
            service.config().find_user_auth("https://fake.git", "alice"),
            Some(UserAuth::new("alice", "token"))
        );
    }
}
