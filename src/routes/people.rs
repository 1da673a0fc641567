//! Clients and employees share one shape and one set of handlers.

use axum::Json;
use axum::extract::{Path, State};

use super::{StatusBody, delete_in_scope, find_in_scope, owner_scope, validation};
use crate::auth::extractor::AuthUser;
use crate::auth::permissions::{Action, Resource};
use crate::error::AppError;
use crate::models::{Person, PersonInput, PersonKind, PersonPatch, PersonStatus};
use crate::repo::Scope;
use crate::state::SharedState;

pub async fn list<K: PersonKind>(
    auth: AuthUser,
    State(state): State<SharedState>,
) -> Result<Json<Vec<Person<K>>>, AppError> {
    auth.require(Resource::Employees, Action::Read)?;
    let people = state.repo::<Person<K>>().list(&owner_scope(&auth)).await;
    Ok(Json(people))
}

pub async fn create<K: PersonKind>(
    auth: AuthUser,
    State(state): State<SharedState>,
    Json(req): Json<PersonInput>,
) -> Result<Json<Person<K>>, AppError> {
    auth.require(Resource::Employees, Action::Create)?;
    validation::required(&req.name, "Name")?;
    validation::email(&req.email)?;

    let person = state
        .repo::<Person<K>>()
        .create(req, &Scope::by("ownerId", auth.id()))
        .await;
    tracing::info!("{} {} created by {}", K::COLLECTION, person.id, auth.id());
    Ok(Json(person))
}

pub async fn update<K: PersonKind>(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path(id): Path<String>,
    Json(patch): Json<PersonPatch>,
) -> Result<Json<Person<K>>, AppError> {
    auth.require(Resource::Employees, Action::Update)?;
    if let Some(name) = &patch.name {
        validation::required(name, "Name")?;
    }
    if let Some(email) = &patch.email {
        validation::email(email)?;
    }

    let repo = state.repo::<Person<K>>();
    let existing = find_in_scope(&repo, &id, &owner_scope(&auth)).await?;
    repo.update(&id, &patch).await;

    Ok(Json(repo.get(&id).await.unwrap_or(existing)))
}

pub async fn set_status<K: PersonKind>(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path(id): Path<String>,
    Json(req): Json<StatusBody<PersonStatus>>,
) -> Result<Json<Person<K>>, AppError> {
    auth.require(Resource::Employees, Action::Update)?;

    let repo = state.repo::<Person<K>>();
    let mut person = find_in_scope(&repo, &id, &owner_scope(&auth)).await?;
    repo.set_status(&id, &req.status).await?;
    person.status = req.status;
    Ok(Json(person))
}

pub async fn delete<K: PersonKind>(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    auth.require_removal(Resource::Employees)?;

    delete_in_scope(&state.repo::<Person<K>>(), &id, &owner_scope(&auth)).await
}
