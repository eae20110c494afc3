//! # Play Store Client
//!
//! The caller-owned entry point. A [`PlayStoreClient`] carries its own device
//! profile, transport and session, so independent clients never share state.
//! Log in once, then call any operation:
//!
//! ```no_run
//! # async fn run() -> Result<(), lib_playstore::error::StoreError> {
//! use lib_playstore::client::PlayStoreClient;
//! use lib_playstore::configs::StoreConfig;
//!
//! let mut client = PlayStoreClient::new(StoreConfig::load(None)?)?;
//! client.login(None).await?;
//! let doc = client.details("com.android.chrome").await?;
//! println!("{:?}", doc.version_code());
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use crate::auth::{AuthManager, LoginCredential, Session};
use crate::codec::{Document, Request, ResponseEnvelope};
use crate::configs::StoreConfig;
use crate::delivery::{DeliveryEngine, PayloadStream};
use crate::device::DeviceProfile;
use crate::error::{AuthError, QueryError, StoreError};
use crate::query::{DetailsWithPages, PageSet, Pager, PartialPages, QueryEngine};
use crate::retrieve::Transport;

pub struct PlayStoreClient {
    device: Arc<DeviceProfile>,
    transport: Transport,
    auth: AuthManager,
    session: Option<Session>,
}

impl PlayStoreClient {
    pub fn new(config: StoreConfig) -> Result<Self, StoreError> {
        config.validate()?;
        let device = Arc::new(config.resolve_device()?);
        let transport = Transport::new(&config, Arc::clone(&device))?;
        tracing::info!(device = %device.name, "play store client created");
        Ok(Self {
            device,
            transport,
            auth: AuthManager::new(config.account),
            session: None,
        })
    }

    pub fn device(&self) -> &DeviceProfile {
        &self.device
    }

    pub fn transport(&self) -> &Transport {
        &self.transport
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    /// Establish a session, replacing any previous one.
    ///
    /// With `token`, no network call is made.
    pub async fn login(&mut self, token: Option<&str>) -> Result<&Session, StoreError> {
        let session = self.auth.login(&self.transport, token).await?;
        Ok(self.session.insert(session))
    }

    /// Log in from an explicit credential instead of the configured account.
    pub async fn login_with(&mut self, credential: LoginCredential) -> Result<&Session, StoreError> {
        let session = self.auth.login_with(&self.transport, credential).await?;
        Ok(self.session.insert(session))
    }

    /// Install a session obtained elsewhere.
    pub fn set_session(&mut self, session: Session) {
        self.session = Some(session);
    }

    fn queries(&self) -> Result<QueryEngine<'_>, QueryError> {
        let session = self.session.as_ref().ok_or(AuthError::NotLoggedIn)?;
        Ok(QueryEngine::new(&self.transport, session))
    }

    pub async fn details(&self, package: &str) -> Result<Document, StoreError> {
        Ok(self.queries()?.details(package).await?)
    }

    pub async fn details_with_pages(&self, package: &str) -> Result<DetailsWithPages, StoreError> {
        Ok(self.queries()?.details_with_pages(package).await?)
    }

    pub async fn bulk_details(
        &self,
        packages: &[String],
        include_child_docs: bool,
        include_details: bool,
    ) -> Result<Vec<Option<Document>>, StoreError> {
        Ok(self
            .queries()?
            .bulk_details(packages, include_child_docs, include_details)
            .await?)
    }

    pub async fn search(&self, query: &str) -> Result<ResponseEnvelope, StoreError> {
        Ok(self.queries()?.search(query).await?)
    }

    pub async fn browse(&self) -> Result<ResponseEnvelope, StoreError> {
        Ok(self.queries()?.browse().await?)
    }

    pub async fn list(
        &self,
        category: Option<&str>,
        subcategory: Option<&str>,
    ) -> Result<ResponseEnvelope, StoreError> {
        Ok(self.queries()?.list(category, subcategory).await?)
    }

    pub async fn list_similar(&self, package: &str) -> Result<ResponseEnvelope, StoreError> {
        Ok(self.queries()?.list_similar(package).await?)
    }

    pub async fn free_request(&self, path: &str) -> Result<ResponseEnvelope, StoreError> {
        Ok(self.queries()?.free_request(path).await?)
    }

    /// Lazy pager over `request`.
    pub fn pager(&self, request: Request) -> Result<Pager<'_>, StoreError> {
        Ok(self.queries()?.pager(request))
    }

    /// Expand `request` into every page the backend serves.
    pub async fn get_pages(&self, request: Request) -> Result<PageSet, PartialPages> {
        match self.queries() {
            Ok(engine) => engine.get_pages(request).await,
            Err(error) => Err(PartialPages {
                pages: PageSet::default(),
                error,
            }),
        }
    }

    /// Continue the expansion of `request` from a first page already in hand,
    /// e.g. the result of [`PlayStoreClient::search`].
    pub async fn get_pages_from(
        &self,
        request: Request,
        first: ResponseEnvelope,
    ) -> Result<PageSet, PartialPages> {
        match self.queries() {
            Ok(engine) => engine.get_pages_from(request, first).await,
            Err(error) => Err(PartialPages {
                pages: PageSet::default(),
                error,
            }),
        }
    }

    /// Latest version code the backend offers this device for `package`.
    pub async fn resolve_latest_version(&self, package: &str) -> Result<i64, StoreError> {
        let doc = self.queries()?.details(package).await?;
        doc.version_code().map(i64::from).ok_or_else(|| {
            StoreError::Query(QueryError::NotFound(format!(
                "{} reports no version code",
                package
            )))
        })
    }

    /// Download `package`, resolving the latest version first when
    /// `version_code` is `None`.
    pub async fn download(
        &self,
        package: &str,
        version_code: Option<i64>,
    ) -> Result<PayloadStream, StoreError> {
        let version_code = match version_code {
            Some(v) => v,
            None => {
                let latest = self.resolve_latest_version(package).await?;
                tracing::info!(package, version_code = latest, "resolved latest version");
                latest
            }
        };
        self.download_version(package, version_code).await
    }

    /// Download `package` at exactly `version_code`.
    pub async fn download_version(
        &self,
        package: &str,
        version_code: i64,
    ) -> Result<PayloadStream, StoreError> {
        let session = self.session.as_ref().ok_or(AuthError::NotLoggedIn)?;
        let engine = DeliveryEngine::new(&self.transport, session);
        Ok(engine.download(package, version_code).await?)
    }
}
