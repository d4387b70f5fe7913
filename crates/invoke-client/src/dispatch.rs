//! Redirect and HTTP failure dispatch
//!
//! Runs only for replies whose status the transport did not accept:
//! - 403 + redirects allowed + `Location` header: navigate and stop
//! - JSON body carrying a structured error: present that error
//! - anything else: present the bare status (and raw body, if any)
//!
//! Every path still produces a rejection for the caller.

use invoke_core::{validate_envelope, EnvelopeStatus, RequestErrorInfo};
use reqwest::StatusCode;

use crate::error::ServiceCallError;
use crate::hooks::Navigator;
use crate::presenter::{ErrorContext, ErrorPresenter, Handling};
use crate::transport::RawReply;

pub struct ErrorDispatcher<'a> {
    presenter: &'a ErrorPresenter,
    navigator: &'a dyn Navigator,
}

impl<'a> ErrorDispatcher<'a> {
    pub fn new(presenter: &'a ErrorPresenter, navigator: &'a dyn Navigator) -> Self {
        Self {
            presenter,
            navigator,
        }
    }

    /// Handle a non-success reply and return the rejection for it
    pub fn http_failure(&self, reply: &RawReply, ctx: &ErrorContext<'_>) -> ServiceCallError {
        let status = reply.status.as_u16();
        let status_text = reply.status_text();

        if reply.status == StatusCode::FORBIDDEN && ctx.allow_redirect {
            if let Some(location) = reply.header("Location") {
                tracing::info!(url = %ctx.call.url, location, "Following 403 redirect");
                self.navigator.navigate(location);
                return ServiceCallError::RedirectRequired {
                    location: location.to_string(),
                };
            }
        }

        tracing::warn!(url = %ctx.call.url, status, "Service call failed");
        let info = RequestErrorInfo::from_status(status, status_text.clone());

        if reply.is_json() {
            if let EnvelopeStatus::ServiceError(response) = validate_envelope(&reply.body) {
                self.presenter.handle_error(Some(&response), &info, ctx);
                return ServiceCallError::Http {
                    status,
                    status_text,
                };
            }
        }

        let info = info.with_response_text(reply.body.clone());
        self.status_only(&info, ctx);
        ServiceCallError::Http {
            status,
            status_text,
        }
    }

    /// Handle a call aborted through its signal
    pub fn cancelled(&self, ctx: &ErrorContext<'_>) -> ServiceCallError {
        self.status_only(&RequestErrorInfo::aborted(), ctx);
        ServiceCallError::Cancelled
    }

    fn status_only(&self, info: &RequestErrorInfo, ctx: &ErrorContext<'_>) {
        if self.presenter.handle_error(None, info, ctx) == Handling::Unpresented {
            self.presenter.show_service_error(None, Some(info), ctx.error_mode);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hooks::{Presented, RecordingNavigator, RecordingRenderer};
    use crate::options::OnError;
    use crate::presenter::{CallInfo, ErrorMode};
    use invoke_core::ServiceTarget;
    use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE, LOCATION};
    use reqwest::Method;
    use std::sync::Arc;

    fn ctx(allow_redirect: bool, on_error: Option<&OnError>) -> ErrorContext<'_> {
        ErrorContext {
            call: CallInfo {
                target: ServiceTarget::service("A/B"),
                method: Method::POST,
                url: url::Url::parse("http://localhost/Services/A/B").unwrap(),
            },
            on_error,
            allow_redirect,
            error_mode: ErrorMode::Alert,
        }
    }

    fn reply(
        status: StatusCode,
        headers: &[(reqwest::header::HeaderName, &'static str)],
        body: &str,
    ) -> RawReply {
        let mut map = HeaderMap::new();
        for (name, value) in headers {
            map.insert(name.clone(), HeaderValue::from_static(value));
        }
        RawReply {
            status,
            headers: map,
            body: body.to_string(),
        }
    }

    struct Fixture {
        presenter: ErrorPresenter,
        renderer: Arc<RecordingRenderer>,
        navigator: RecordingNavigator,
    }

    fn fixture() -> Fixture {
        let renderer = Arc::new(RecordingRenderer::new());
        Fixture {
            presenter: ErrorPresenter::new(renderer.clone()),
            renderer,
            navigator: RecordingNavigator::new(),
        }
    }

    #[test]
    fn test_403_with_location_navigates() {
        let f = fixture();
        let dispatcher = ErrorDispatcher::new(&f.presenter, &f.navigator);
        let err = dispatcher.http_failure(
            &reply(StatusCode::FORBIDDEN, &[(LOCATION, "/login")], ""),
            &ctx(true, None),
        );

        assert!(matches!(
            err,
            ServiceCallError::RedirectRequired { ref location } if location == "/login"
        ));
        assert_eq!(f.navigator.location().as_deref(), Some("/login"));
        assert!(f.renderer.is_empty());
    }

    #[test]
    fn test_403_redirect_disabled_presents_status() {
        let f = fixture();
        let dispatcher = ErrorDispatcher::new(&f.presenter, &f.navigator);
        let err = dispatcher.http_failure(
            &reply(StatusCode::FORBIDDEN, &[(LOCATION, "/login")], ""),
            &ctx(false, None),
        );

        assert!(matches!(err, ServiceCallError::Http { status: 403, .. }));
        assert_eq!(f.navigator.location(), None);
        assert_eq!(
            f.renderer.shown(),
            vec![Presented::Alert("HTTP 403 error! Check browser console for details.".into())]
        );
    }

    #[test]
    fn test_403_without_location_is_plain_failure() {
        let f = fixture();
        let dispatcher = ErrorDispatcher::new(&f.presenter, &f.navigator);
        dispatcher.http_failure(&reply(StatusCode::FORBIDDEN, &[], ""), &ctx(true, None));
        assert_eq!(f.navigator.location(), None);
        assert_eq!(f.renderer.shown().len(), 1);
    }

    #[test]
    fn test_json_structured_error_presented() {
        let f = fixture();
        let dispatcher = ErrorDispatcher::new(&f.presenter, &f.navigator);
        let err = dispatcher.http_failure(
            &reply(
                StatusCode::BAD_REQUEST,
                &[(CONTENT_TYPE, "application/json")],
                r#"{"Error":{"Code":"Validation","Message":"Name required"}}"#,
            ),
            &ctx(true, None),
        );

        assert_eq!(err.to_string(), "HTTP 400: Bad Request!");
        assert_eq!(f.renderer.shown(), vec![Presented::Alert("Name required".into())]);
    }

    #[test]
    fn test_html_error_page_in_frame() {
        let f = fixture();
        let dispatcher = ErrorDispatcher::new(&f.presenter, &f.navigator);
        dispatcher.http_failure(
            &reply(
                StatusCode::INTERNAL_SERVER_ERROR,
                &[(CONTENT_TYPE, "text/html")],
                "<html>stack trace</html>",
            ),
            &ctx(true, None),
        );
        assert_eq!(
            f.renderer.shown(),
            vec![Presented::Frame("<html>stack trace</html>".into())]
        );
    }

    #[test]
    fn test_500_without_body() {
        let f = fixture();
        let dispatcher = ErrorDispatcher::new(&f.presenter, &f.navigator);
        dispatcher.http_failure(
            &reply(StatusCode::INTERNAL_SERVER_ERROR, &[], ""),
            &ctx(true, None),
        );
        assert_eq!(
            f.renderer.shown(),
            vec![Presented::Alert(
                "HTTP 500: Connection refused! Check browser console for details.".into()
            )]
        );
    }

    #[test]
    fn test_on_error_suppresses_status_only() {
        let f = fixture();
        let dispatcher = ErrorDispatcher::new(&f.presenter, &f.navigator);
        let on_error: OnError = Box::new(|response, info| {
            assert!(response.is_none());
            info.status == Some(404)
        });
        dispatcher.http_failure(
            &reply(StatusCode::NOT_FOUND, &[], "missing"),
            &ctx(true, Some(&on_error)),
        );
        assert!(f.renderer.is_empty());
    }

    #[test]
    fn test_cancelled_is_silent() {
        let f = fixture();
        let dispatcher = ErrorDispatcher::new(&f.presenter, &f.navigator);
        let err = dispatcher.cancelled(&ctx(true, None));
        assert!(matches!(err, ServiceCallError::Cancelled));
        assert!(f.renderer.is_empty());
    }
}
