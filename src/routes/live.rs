//! Server-sent event feeds backed by [`LiveList`].
//!
//! Each feed sends the current list as a `snapshot` event, then a new
//! `snapshot` whenever the store pushes. The subscription is torn down when
//! the client disconnects and the stream is dropped.

use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures_util::Stream;

use super::projects::project_scope;
use crate::auth::extractor::AuthUser;
use crate::auth::permissions::{Action, Resource};
use crate::error::AppError;
use crate::live::LiveList;
use crate::models::{Project, Task};
use crate::repo::{Entity, tasks};
use crate::state::SharedState;

fn snapshots<E: Entity>(live: LiveList<E>) -> impl Stream<Item = Result<Event, axum::Error>> {
    futures_util::stream::unfold((live, true), |(mut live, first)| async move {
        if !first && !live.changed().await {
            return None;
        }
        let event = Event::default().event("snapshot").json_data(live.snapshot());
        Some((event, (live, false)))
    })
}

pub async fn tasks(
    auth: AuthUser,
    State(state): State<SharedState>,
) -> Result<Sse<impl Stream<Item = Result<Event, axum::Error>>>, AppError> {
    auth.require(Resource::Projects, Action::Read)?;
    let scope = tasks::list_scope(auth.role(), auth.id());
    let live = LiveList::start(&state.repo::<Task>(), scope).await;
    Ok(Sse::new(snapshots(live)).keep_alive(KeepAlive::default()))
}

pub async fn projects(
    auth: AuthUser,
    State(state): State<SharedState>,
) -> Result<Sse<impl Stream<Item = Result<Event, axum::Error>>>, AppError> {
    auth.require(Resource::Projects, Action::Read)?;
    let live = LiveList::start(&state.repo::<Project>(), project_scope(&auth)).await;
    Ok(Sse::new(snapshots(live)).keep_alive(KeepAlive::default()))
}
