//! Request dispatcher.
//!
//! # Responsibilities
//! - Resolve method and route, answering 405 and 404 itself
//! - Run the matching filter chain, then the endpoint
//! - Turn errors and panics into a generic 500 and report them
//! - Emit exactly one statistics record per request

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use axum::http::StatusCode;
use futures_util::FutureExt;
use uuid::Uuid;

use crate::components::{DependencyCache, Resolver};
use crate::dispatch::hooks::Panicked;
use crate::dispatch::{
    BoxError, Context, ErrorReport, ErrorSink, FailureOrigin, FilterResult, FilterStats, Flow,
    Request, RequestStats, Response, StatsSink,
};
use crate::routing::{Method, RouteMatch, RouteTable};

/// How dispatch of one request ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Every filter continued and the endpoint returned normally.
    Handled,
    /// A filter returned [`Flow::Stop`].
    Stopped,
    NotFound,
    MethodNotAllowed,
    FilterFailed,
    EndpointFailed,
}

/// Summary handed back to the host transport.
#[derive(Debug, Clone, Copy)]
pub struct Dispatched {
    pub request_id: Uuid,
    pub outcome: DispatchOutcome,
    pub status: StatusCode,
}

/// Immutable dispatch state of a started server.
pub struct Dispatcher {
    table: RouteTable,
    app_cache: Arc<DependencyCache>,
    resolver: Arc<dyn Resolver>,
    stats: Arc<dyn StatsSink>,
    errors: Arc<dyn ErrorSink>,
}

enum Step<T> {
    Done(T),
    Failed(BoxError, FilterResult),
}

impl Dispatcher {
    pub fn new(
        table: RouteTable,
        app_cache: Arc<DependencyCache>,
        resolver: Arc<dyn Resolver>,
        stats: Arc<dyn StatsSink>,
        errors: Arc<dyn ErrorSink>,
    ) -> Self {
        Self {
            table,
            app_cache,
            resolver,
            stats,
            errors,
        }
    }

    pub fn table(&self) -> &RouteTable {
        &self.table
    }

    /// Context for work that happens outside HTTP dispatch (WebSocket
    /// messages), with its own request-scoped cache.
    pub(crate) fn context(&self, route: RouteMatch) -> Context {
        Context::new(
            Uuid::new_v4(),
            route,
            &self.app_cache,
            self.resolver.clone(),
        )
    }

    pub(crate) fn report(&self, request_id: Uuid, origin: FailureOrigin, error: &BoxError) {
        self.errors.report(&ErrorReport {
            request_id,
            origin,
            error: error.as_ref(),
        });
    }

    /// Dispatch one request, writing the result into `response`.
    pub async fn dispatch(&self, request: Request, response: Response) -> Dispatched {
        let started = Instant::now();
        let request_id = Uuid::new_v4();
        let mut stats = RequestStats::new(request_id, &request.method, &request.path);

        let outcome = self
            .run(Arc::new(request), &response, request_id, &mut stats)
            .await;

        let status = response.status();
        stats.status = status.as_u16();
        stats.duration = started.elapsed();
        self.stats.record(&stats);

        Dispatched {
            request_id,
            outcome,
            status,
        }
    }

    async fn run(
        &self,
        request: Arc<Request>,
        response: &Response,
        request_id: Uuid,
        stats: &mut RequestStats,
    ) -> DispatchOutcome {
        let Ok(method) = request.method.parse::<Method>() else {
            response.reset(StatusCode::METHOD_NOT_ALLOWED, "Method Not Allowed");
            return DispatchOutcome::MethodNotAllowed;
        };

        let Some((entry, params)) = self.table.match_route(method, &request.path) else {
            response.reset(StatusCode::NOT_FOUND, "Not Found");
            return DispatchOutcome::NotFound;
        };
        let pattern = entry.pattern.as_str().to_string();
        stats.endpoint = pattern.clone();

        let ctx = Context::new(
            request_id,
            RouteMatch::new(pattern.as_str(), params),
            &self.app_cache,
            self.resolver.clone(),
        );

        for filter in self.table.filters_for(method, &request.path) {
            let begun = Instant::now();
            let call = filter.filter.call(request.clone(), response.clone(), ctx.clone());
            let step = guarded(call).await;

            let filter_pattern = filter.pattern.as_str().to_string();
            let result = match &step {
                Step::Done(_) => FilterResult::Ok,
                Step::Failed(_, result) => *result,
            };
            stats.filters.push(FilterStats {
                path: filter_pattern.clone(),
                result,
                duration: begun.elapsed(),
            });

            match step {
                Step::Done(Flow::Continue) => {}
                Step::Done(Flow::Stop) => return DispatchOutcome::Stopped,
                Step::Failed(error, _) => {
                    self.fail(response, request_id, FailureOrigin::Filter { pattern: filter_pattern }, &error);
                    return DispatchOutcome::FilterFailed;
                }
            }
        }

        let begun = Instant::now();
        let step = guarded(entry.handler.call(request, response.clone(), ctx)).await;
        stats.endpoint_duration = Some(begun.elapsed());

        match step {
            Step::Done(()) => DispatchOutcome::Handled,
            Step::Failed(error, _) => {
                self.fail(response, request_id, FailureOrigin::Endpoint { pattern }, &error);
                DispatchOutcome::EndpointFailed
            }
        }
    }

    fn fail(&self, response: &Response, request_id: Uuid, origin: FailureOrigin, error: &BoxError) {
        response.reset(StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error");
        self.report(request_id, origin, error);
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("table", &self.table)
            .field("app_cache", &self.app_cache)
            .finish_non_exhaustive()
    }
}

/// Await a handler future, classifying errors and panics.
async fn guarded<T, F>(future: F) -> Step<T>
where
    F: std::future::Future<Output = Result<T, BoxError>>,
{
    match AssertUnwindSafe(future).catch_unwind().await {
        Ok(Ok(value)) => Step::Done(value),
        Ok(Err(error)) => Step::Failed(error, FilterResult::Exception),
        Err(panic) => Step::Failed(
            Box::new(Panicked::from_payload(panic.as_ref())),
            FilterResult::ServerException,
        ),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::time::Duration;

    use super::*;
    use crate::components::DenyAll;
    use crate::lifecycle::LifecycleState;
    use crate::routing::{Compose, Composer};

    #[derive(Default)]
    struct Recorder {
        stats: Mutex<Vec<RequestStats>>,
        errors: Mutex<Vec<(FailureOrigin, String)>>,
    }

    impl StatsSink for Recorder {
        fn record(&self, stats: &RequestStats) {
            self.stats.lock().unwrap().push(stats.clone());
        }
    }

    impl ErrorSink for Recorder {
        fn report(&self, report: &ErrorReport<'_>) {
            self.errors
                .lock()
                .unwrap()
                .push((report.origin.clone(), report.error.to_string()));
        }
    }

    fn dispatcher(build: impl FnOnce(&mut Composer)) -> (Dispatcher, Arc<Recorder>) {
        let mut composer = Composer::new(LifecycleState::new());
        build(&mut composer);
        let recorder = Arc::new(Recorder::default());
        let dispatcher = Dispatcher::new(
            composer.table().clone(),
            DependencyCache::application(),
            Arc::new(DenyAll),
            recorder.clone(),
            recorder.clone(),
        );
        (dispatcher, recorder)
    }

    async fn profile(_req: Arc<Request>, res: Response, ctx: Context) -> Result<(), BoxError> {
        res.write(format!("User profile: {}", ctx.param("1").unwrap_or_default()));
        Ok(())
    }

    async fn pass(_req: Arc<Request>, _res: Response, _ctx: Context) -> Result<Flow, BoxError> {
        Ok(Flow::Continue)
    }

    #[tokio::test]
    async fn not_found_counts_no_filters() {
        let (dispatcher, recorder) = dispatcher(|c| {
            c.get("/users/(\\w+)", profile).unwrap();
            c.filter("/users/.*", pass).unwrap();
        });

        let response = Response::new();
        let done = dispatcher
            .dispatch(Request::new("GET", "/users/Jimmy/extra"), response.clone())
            .await;
        assert_eq!(done.outcome, DispatchOutcome::NotFound);
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let stats = recorder.stats.lock().unwrap();
        assert_eq!(stats.len(), 1);
        assert_eq!(stats[0].endpoint, "unmatched");
        assert!(stats[0].filters.is_empty());
        assert_eq!(stats[0].status, 404);
    }

    #[tokio::test]
    async fn unknown_method_is_405() {
        let (dispatcher, recorder) = dispatcher(|c| {
            c.get("/x", profile).unwrap();
        });
        let done = dispatcher
            .dispatch(Request::new("BREW", "/x"), Response::new())
            .await;
        assert_eq!(done.outcome, DispatchOutcome::MethodNotAllowed);
        assert_eq!(done.status, StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(recorder.stats.lock().unwrap()[0].status, 405);
    }

    #[tokio::test]
    async fn panicking_endpoint_becomes_generic_500() {
        let (dispatcher, recorder) = dispatcher(|c| {
            c.get("/boom", |_req: Arc<Request>, res: Response, _ctx: Context| async move {
                res.write("partial");
                if res.status() == StatusCode::OK {
                    panic!("secret detail");
                }
                Ok::<(), BoxError>(())
            })
            .unwrap();
        });

        let response = Response::new();
        let done = dispatcher
            .dispatch(Request::new("GET", "/boom"), response.clone())
            .await;
        assert_eq!(done.outcome, DispatchOutcome::EndpointFailed);

        let parts = response.snapshot();
        assert_eq!(parts.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(parts.body, b"Internal Server Error");

        let errors = recorder.errors.lock().unwrap();
        assert_eq!(
            errors[0].0,
            FailureOrigin::Endpoint {
                pattern: "^/boom$".into()
            }
        );
        assert!(errors[0].1.contains("secret detail"));
    }

    #[tokio::test]
    async fn failing_filter_stops_the_chain() {
        let (dispatcher, recorder) = dispatcher(|c| {
            c.filter("/guarded", |_req: Arc<Request>, _res: Response, _ctx: Context| async {
                Err::<Flow, BoxError>("denied".into())
            })
            .unwrap();
            c.filter_for(Method::Get, "/guarded", pass).unwrap();
            c.get("/guarded", profile).unwrap();
        });

        let done = dispatcher
            .dispatch(Request::new("GET", "/guarded"), Response::new())
            .await;
        assert_eq!(done.outcome, DispatchOutcome::FilterFailed);

        let stats = recorder.stats.lock().unwrap();
        assert_eq!(stats[0].filters.len(), 1);
        assert_eq!(stats[0].filters[0].result, FilterResult::Exception);
        assert!(stats[0].endpoint_duration.is_none());
        assert_eq!(stats[0].status, 500);
    }

    #[tokio::test]
    async fn endpoint_duration_is_recorded() {
        let (dispatcher, recorder) = dispatcher(|c| {
            c.get("/slow", |_req: Arc<Request>, _res: Response, _ctx: Context| async {
                tokio::time::sleep(Duration::from_millis(20)).await;
                Ok::<(), BoxError>(())
            })
            .unwrap();
        });
        dispatcher
            .dispatch(Request::new("GET", "/slow"), Response::new())
            .await;

        let stats = recorder.stats.lock().unwrap();
        assert!(stats[0].endpoint_duration.unwrap() >= Duration::from_millis(20));
        assert!(stats[0].duration >= stats[0].endpoint_duration.unwrap());
        assert_eq!(stats[0].endpoint, "^/slow$");
    }
}
