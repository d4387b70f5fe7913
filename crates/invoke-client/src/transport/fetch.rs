//! Non-blocking transport on the caller's runtime

use futures::future::BoxFuture;
use futures::FutureExt;
use reqwest::StatusCode;

use super::{exchange, PreparedRequest, RawReply, Transport};
use crate::error::Result;

pub struct FetchTransport {
    http: reqwest::Client,
}

impl FetchTransport {
    pub fn new(http: reqwest::Client) -> Self {
        Self { http }
    }
}

impl Default for FetchTransport {
    fn default() -> Self {
        Self::new(reqwest::Client::new())
    }
}

impl Transport for FetchTransport {
    fn name(&self) -> &'static str {
        "fetch"
    }

    fn is_success(&self, status: StatusCode) -> bool {
        status.is_success()
    }

    // reqwest keeps no HTTP cache, so every cache mode is already honoured
    // without extra headers.

    fn send<'a>(&'a self, request: &'a PreparedRequest) -> BoxFuture<'a, Result<RawReply>> {
        exchange(&self.http, request).boxed()
    }
}
