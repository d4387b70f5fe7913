//! Service client: one contract over both transports
//!
//! Every call runs the same pipeline:
//!
//! ```text
//! resolve target -> defaults + token -> accounting start
//!   -> UI block -> transport -> envelope check -> on_success
//!   <- UI unblock + on_cleanup <- accounting finish
//! ```
//!
//! Failures go to the [`ErrorDispatcher`] (HTTP status) or the
//! [`ErrorPresenter`] (structured error) and still reject.

use std::sync::Arc;

use futures::future::{self, BoxFuture};
use futures::FutureExt;
use invoke_core::{
    validate_envelope, ClientConfig, EnvelopeStatus, RequestErrorInfo, ServiceResponse,
    ServiceTarget,
};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE};
use reqwest::Method;
use serde_json::Value;

use crate::abort::AbortSignal;
use crate::accounting::RequestAccounting;
use crate::credentials::CredentialInjector;
use crate::dispatch::ErrorDispatcher;
use crate::error::{Result, ServiceCallError};
use crate::hooks::{
    CookieReader, ErrorRenderer, Navigator, TracingNavigator, TracingRenderer, TracingUiBlocker,
    UiBlocker,
};
use crate::options::{CacheMode, OnCleanup, OnSuccess, ServiceCallOptions};
use crate::presenter::{CallInfo, ErrorContext, ErrorPresenter, NotLoggedInHandler};
use crate::transport::{BlockingTransport, FetchTransport, PreparedRequest, Transport};

const JSON: &str = "application/json";

pub struct ServiceClient {
    config: ClientConfig,
    credentials: CredentialInjector,
    accounting: Arc<RequestAccounting>,
    ui: Arc<dyn UiBlocker>,
    presenter: ErrorPresenter,
    navigator: Arc<dyn Navigator>,
    http: reqwest::Client,
    fetch: FetchTransport,
    blocking: BlockingTransport,
}

impl ServiceClient {
    /// Client with default collaborators and process-wide accounting
    pub fn new(config: ClientConfig) -> Result<Self> {
        ServiceClientBuilder::new(config).build()
    }

    pub fn builder(config: ClientConfig) -> ServiceClientBuilder {
        ServiceClientBuilder::new(config)
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn presenter(&self) -> &ErrorPresenter {
        &self.presenter
    }

    pub fn credentials(&self) -> &CredentialInjector {
        &self.credentials
    }

    pub fn active_requests(&self) -> usize {
        self.accounting.active_requests()
    }

    /// Call through the non-blocking transport.
    ///
    /// The `asynchronous` flag is not consulted; see [`Self::service_call`].
    pub async fn call(&self, options: ServiceCallOptions) -> Result<ServiceResponse> {
        self.execute(&self.fetch, options).await
    }

    /// Call through the blocking transport, freezing the current thread
    /// until the round-trip completes.
    ///
    /// Fails with [`ServiceCallError::InvalidRequest`] when issued from
    /// inside an async runtime.
    pub fn call_blocking(&self, mut options: ServiceCallOptions) -> Result<ServiceResponse> {
        let runtime = match self.blocking.runtime() {
            Ok(runtime) => runtime,
            Err(e) => {
                run_cleanup(options.on_cleanup.take());
                return Err(e);
            }
        };
        runtime.block_on(self.execute(&self.blocking, options))
    }

    /// Pick the transport from `options.asynchronous`.
    ///
    /// A synchronous call does all of its work before this returns; the
    /// future is already resolved.
    pub fn service_call(
        &self,
        options: ServiceCallOptions,
    ) -> BoxFuture<'_, Result<ServiceResponse>> {
        if options.asynchronous {
            self.call(options).boxed()
        } else {
            future::ready(self.call_blocking(options)).boxed()
        }
    }

    /// Shorthand for calling a service by name with a payload
    pub fn service_request(
        &self,
        service: &str,
        request: Value,
        on_success: Option<OnSuccess>,
        options: Option<ServiceCallOptions>,
    ) -> BoxFuture<'_, Result<ServiceResponse>> {
        let mut options = options.unwrap_or_else(|| ServiceCallOptions::service(service));
        options.target = ServiceTarget::service(service);
        options.request = Some(request);
        if on_success.is_some() {
            options.on_success = on_success;
        }
        self.service_call(options)
    }

    /// Request builder for call sites that bypass the service pipeline.
    ///
    /// The default-request hook attaches the security token unless the
    /// target is cross-domain.
    pub fn default_request(&self, method: Method, url: &str) -> Result<reqwest::RequestBuilder> {
        let url = self.config.absolute_url(&self.config.resolve_url(url))?;
        let cross_domain = !self.credentials.is_same_origin(&url);
        Ok(self
            .credentials
            .before_send(self.http.request(method, url), cross_domain))
    }

    async fn execute(
        &self,
        transport: &dyn Transport,
        options: ServiceCallOptions,
    ) -> Result<ServiceResponse> {
        let ServiceCallOptions {
            target,
            request,
            method,
            asynchronous: _,
            block_ui,
            allow_redirect,
            headers,
            cache,
            signal,
            error_mode,
            on_success,
            on_error,
            on_cleanup,
        } = options;

        let resolved = target.resolve(&self.config.application_path);
        let prepared = match self.prepare(method, &resolved, headers, request, cache, signal) {
            Ok(mut prepared) => {
                transport.prepare(&mut prepared);
                prepared
            }
            Err(e) => {
                run_cleanup(on_cleanup);
                return Err(e);
            }
        };

        let ctx = ErrorContext {
            call: CallInfo {
                target,
                method: prepared.method.clone(),
                url: prepared.url.clone(),
            },
            on_error: on_error.as_ref(),
            allow_redirect,
            error_mode,
        };
        let dispatcher = ErrorDispatcher::new(&self.presenter, self.navigator.as_ref());

        tracing::debug!(
            transport = transport.name(),
            method = %prepared.method,
            url = %prepared.url,
            "Service call starting"
        );

        let _request = self.accounting.start();
        let _ui = UiBlockGuard::new(Arc::clone(&self.ui), block_ui, on_cleanup);

        let reply = match transport.send(&prepared).await {
            Ok(reply) => reply,
            Err(ServiceCallError::Cancelled) => return Err(dispatcher.cancelled(&ctx)),
            Err(e) => {
                tracing::warn!(
                    url = %prepared.url,
                    error = %e,
                    "Service call did not reach the server"
                );
                return Err(e);
            }
        };

        if !transport.is_success(reply.status) {
            return Err(dispatcher.http_failure(&reply, &ctx));
        }

        match validate_envelope(&reply.body) {
            EnvelopeStatus::Empty => {
                tracing::warn!(url = %prepared.url, "Empty response received");
                Err(ServiceCallError::EmptyResponse)
            }
            EnvelopeStatus::ServiceError(response) => {
                let info =
                    RequestErrorInfo::from_status(reply.status.as_u16(), reply.status_text());
                self.presenter.handle_error(Some(&response), &info, &ctx);
                let error = response.error().cloned().unwrap_or_default();
                tracing::debug!(
                    url = %prepared.url,
                    code = ?error.code,
                    "Service reported an error"
                );
                Err(ServiceCallError::Service(error))
            }
            EnvelopeStatus::Success(response) => {
                if let Some(on_success) = on_success {
                    on_success(&response);
                }
                Ok(response)
            }
        }
    }

    fn prepare(
        &self,
        method: Method,
        resolved: &str,
        mut headers: HeaderMap,
        request: Option<Value>,
        cache: Option<CacheMode>,
        signal: Option<AbortSignal>,
    ) -> Result<PreparedRequest> {
        let url = self.config.absolute_url(resolved)?;

        headers
            .entry(ACCEPT)
            .or_insert(HeaderValue::from_static(JSON));
        headers
            .entry(CONTENT_TYPE)
            .or_insert(HeaderValue::from_static(JSON));
        self.credentials.apply(&url, &mut headers);

        let body = match request {
            Some(_) if method == Method::GET || method == Method::HEAD => None,
            Some(value) => Some(serde_json::to_string(&value).map_err(|e| {
                ServiceCallError::InvalidRequest(format!("request payload: {e}"))
            })?),
            None => None,
        };

        Ok(PreparedRequest {
            method,
            url,
            headers,
            body,
            cache,
            signal,
        })
    }
}

fn run_cleanup(on_cleanup: Option<OnCleanup>) {
    if let Some(cleanup) = on_cleanup {
        cleanup();
    }
}

/// Holds the UI block for the inner attempt and runs the caller's cleanup
/// right after releasing it.
struct UiBlockGuard {
    ui: Arc<dyn UiBlocker>,
    blocked: bool,
    on_cleanup: Option<OnCleanup>,
}

impl UiBlockGuard {
    fn new(ui: Arc<dyn UiBlocker>, block: bool, on_cleanup: Option<OnCleanup>) -> Self {
        if block {
            ui.block();
        }
        Self {
            ui,
            blocked: block,
            on_cleanup,
        }
    }
}

impl Drop for UiBlockGuard {
    fn drop(&mut self) {
        if self.blocked {
            self.ui.block_undo();
        }
        run_cleanup(self.on_cleanup.take());
    }
}

/// Builder for [`ServiceClient`]
pub struct ServiceClientBuilder {
    config: ClientConfig,
    cookie_reader: Option<Arc<dyn CookieReader>>,
    accounting: Option<Arc<RequestAccounting>>,
    ui: Option<Arc<dyn UiBlocker>>,
    renderer: Option<Arc<dyn ErrorRenderer>>,
    navigator: Option<Arc<dyn Navigator>>,
    not_logged_in: Option<NotLoggedInHandler>,
    http: Option<reqwest::Client>,
}

impl ServiceClientBuilder {
    pub fn new(config: ClientConfig) -> Self {
        Self {
            config,
            cookie_reader: None,
            accounting: None,
            ui: None,
            renderer: None,
            navigator: None,
            not_logged_in: None,
            http: None,
        }
    }

    pub fn cookie_reader(mut self, reader: Arc<dyn CookieReader>) -> Self {
        self.cookie_reader = Some(reader);
        self
    }

    /// Use a dedicated counter instead of the process-wide one
    pub fn accounting(mut self, accounting: Arc<RequestAccounting>) -> Self {
        self.accounting = Some(accounting);
        self
    }

    pub fn ui_blocker(mut self, ui: Arc<dyn UiBlocker>) -> Self {
        self.ui = Some(ui);
        self
    }

    pub fn renderer(mut self, renderer: Arc<dyn ErrorRenderer>) -> Self {
        self.renderer = Some(renderer);
        self
    }

    pub fn navigator(mut self, navigator: Arc<dyn Navigator>) -> Self {
        self.navigator = Some(navigator);
        self
    }

    pub fn not_logged_in(
        mut self,
        handler: impl Fn(&CallInfo, &ServiceResponse) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.not_logged_in = Some(Arc::new(handler));
        self
    }

    /// HTTP client for the non-blocking transport
    pub fn http_client(mut self, http: reqwest::Client) -> Self {
        self.http = Some(http);
        self
    }

    pub fn build(self) -> Result<ServiceClient> {
        let credentials = CredentialInjector::new(&self.config, self.cookie_reader)?;
        let presenter = ErrorPresenter::new(
            self.renderer
                .unwrap_or_else(|| Arc::new(TracingRenderer)),
        )
        .with_not_logged_in(self.not_logged_in)
        .with_development_mode(self.config.is_development_mode());
        let http = self.http.unwrap_or_default();

        Ok(ServiceClient {
            credentials,
            accounting: self.accounting.unwrap_or_else(RequestAccounting::global),
            ui: self.ui.unwrap_or_else(|| Arc::new(TracingUiBlocker)),
            presenter,
            navigator: self.navigator.unwrap_or_else(|| Arc::new(TracingNavigator)),
            fetch: FetchTransport::new(http.clone()),
            http,
            blocking: BlockingTransport::new()?,
            config: self.config,
        })
    }
}
