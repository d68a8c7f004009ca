//! Collection read routes
//!
//! Each route returns every row of one table. Passing `?page=N` switches to
//! pages of [`PAGE_SIZE`](mmtl_common::pagination::PAGE_SIZE) rows and adds
//! paging metadata to the response.

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tracing::debug;

use mmtl_common::db::raw_events::{self, RawCollection};
use mmtl_common::db::correlated;
use mmtl_common::models::{RawAllEvent, RawGwEvent, Stored, StoredCorrelated};
use mmtl_common::pagination::Pagination;

use crate::error::{ApiError, ApiResult};
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    /// 1-indexed page; omitted means the whole collection
    pub page: Option<i64>,
}

/// Collection read response
#[derive(Debug, Serialize)]
pub struct ListResponse<T> {
    pub success: bool,
    pub data: Vec<T>,
    #[serde(flatten)]
    pub pagination: Option<Pagination>,
}

impl<T> ListResponse<T> {
    fn new(data: Vec<T>, pagination: Option<Pagination>) -> Self {
        Self {
            success: true,
            data,
            pagination,
        }
    }
}

async fn connected_pool(state: &AppState) -> ApiResult<SqlitePool> {
    state.db.connect().await;
    Ok(state.db.pool()?)
}

fn page_query(query: Result<Query<PageQuery>, QueryRejection>) -> ApiResult<Option<i64>> {
    let Query(query) = query.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    Ok(query.page)
}

/// GET /api/correlated
pub async fn list_correlated(
    State(state): State<AppState>,
    query: Result<Query<PageQuery>, QueryRejection>,
) -> ApiResult<Json<ListResponse<StoredCorrelated>>> {
    let page = page_query(query)?;
    let pool = connected_pool(&state).await?;

    let response = match page {
        None => ListResponse::new(correlated::fetch_all(&pool).await?, None),
        Some(page) => {
            let pagination = Pagination::new(correlated::count(&pool).await?, page);
            let rows =
                correlated::fetch_page(&pool, pagination.page_size, pagination.offset).await?;
            ListResponse::new(rows, Some(pagination))
        }
    };

    debug!(rows = response.data.len(), "Listed correlated results");
    Ok(Json(response))
}

async fn list_raw<T>(
    state: &AppState,
    collection: RawCollection,
    page: Option<i64>,
) -> ApiResult<ListResponse<Stored<T>>>
where
    T: serde::de::DeserializeOwned + Serialize,
{
    let pool = connected_pool(state).await?;

    let response = match page {
        None => ListResponse::new(raw_events::fetch_all(&pool, collection).await?, None),
        Some(page) => {
            let pagination = Pagination::new(raw_events::count(&pool, collection).await?, page);
            let rows = raw_events::fetch_page(
                &pool,
                collection,
                pagination.page_size,
                pagination.offset,
            )
            .await?;
            ListResponse::new(rows, Some(pagination))
        }
    };

    debug!(table = collection.table(), rows = response.data.len(), "Listed raw events");
    Ok(response)
}

/// GET /api/getalldata
pub async fn list_all_events(
    State(state): State<AppState>,
    query: Result<Query<PageQuery>, QueryRejection>,
) -> ApiResult<Json<ListResponse<Stored<RawAllEvent>>>> {
    let page = page_query(query)?;
    Ok(Json(list_raw(&state, RawCollection::AllEvents, page).await?))
}

/// GET /api/getalldatagw
pub async fn list_gw_events(
    State(state): State<AppState>,
    query: Result<Query<PageQuery>, QueryRejection>,
) -> ApiResult<Json<ListResponse<Stored<RawGwEvent>>>> {
    let page = page_query(query)?;
    Ok(Json(list_raw(&state, RawCollection::GwEvents, page).await?))
}
