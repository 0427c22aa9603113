//! Session helpers keeping HTTP handlers free of framework-specific logic.
//!
//! The account subsystem writes the driver's UUID into the session cookie
//! under [`DRIVER_ID_KEY`]; handlers here only read it.

use actix_session::Session;
use actix_web::{FromRequest, HttpRequest, dev::Payload};
use futures_util::future::LocalBoxFuture;
use tracing::warn;

use crate::domain::{DriverId, Error};

pub const DRIVER_ID_KEY: &str = "driver_id";

/// Newtype wrapper exposing driver-level session operations.
#[derive(Clone)]
pub struct SessionContext(Session);

impl SessionContext {
    pub fn new(session: Session) -> Self {
        Self(session)
    }

    /// Store the driver id; used by sign-in flows and tests.
    pub fn persist_driver(&self, driver: &DriverId) -> Result<(), Error> {
        self.0
            .insert(DRIVER_ID_KEY, driver.to_string())
            .map_err(|error| Error::internal(format!("failed to persist session: {error}")))
    }

    /// Fetch the driver id, treating a malformed value as absent.
    pub fn driver_id(&self) -> Result<Option<DriverId>, Error> {
        let raw = self
            .0
            .get::<String>(DRIVER_ID_KEY)
            .map_err(|error| Error::internal(format!("failed to read session: {error}")))?;
        Ok(raw.and_then(|raw| match DriverId::new(&raw) {
            Ok(id) => Some(id),
            Err(error) => {
                warn!(%error, "invalid driver id in session cookie");
                None
            }
        }))
    }

    /// Require a signed-in driver or return `401 Unauthorized`.
    pub fn require_driver_id(&self) -> Result<DriverId, Error> {
        self.driver_id()?
            .ok_or_else(|| Error::unauthorized("sign in required"))
    }
}

impl FromRequest for SessionContext {
    type Error = actix_web::Error;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, payload: &mut Payload) -> Self::Future {
        let fut = Session::from_request(req, payload);
        Box::pin(async move { fut.await.map(SessionContext::new) })
    }
}
