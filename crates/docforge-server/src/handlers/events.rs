//! Server-sent event stream for one project's workflow activity (C13).
//! `/events` is a live tail: a client that connects mid-run only sees
//! events published after it subscribes, same as `/progress` being the
//! point-in-time complement to this endpoint.

use std::time::Duration;

use axum::extract::{Path, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::Extension;
use docforge_core::tenant::AuthContext;
use docforge_types::permissions::Permission;
use futures::Stream;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;
use uuid::Uuid;

use crate::error::AppError;
use crate::state::AppState;

pub async fn stream_events(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Path(project_id): Path<Uuid>,
) -> Result<Sse<impl Stream<Item = Result<Event, std::convert::Infallible>>>, AppError> {
    let role = state.accounts.get_member_role(ctx.tenant_id, project_id, ctx.user_id).await?;
    let resolved = AuthContext {
        role,
        project_id: Some(project_id),
        ..ctx.clone()
    };
    resolved.require(Permission::ProjectRead)?;

    let rx = state.streaming.subscribe(ctx.tenant_id, project_id);
    let stream = BroadcastStream::new(rx).filter_map(|message| match message {
        Ok(event) => Some(Ok(Event::default().data(event.to_sse_data()))),
        Err(_lagged) => None,
    });

    Ok(Sse::new(stream).keep_alive(KeepAlive::new().interval(Duration::from_secs(10))))
}
