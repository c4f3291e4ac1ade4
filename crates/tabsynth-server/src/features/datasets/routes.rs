use crate::api::response::{ApiResponse, AppError, ErrorResponse};
use crate::auth::CurrentUser;
use crate::context::AppContext;
use axum::{
    extract::{multipart::MultipartError, Multipart, Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use tabsynth_engine::synthesis::SynthesisForm;

use super::{
    commands::{
        DeleteDatasetCommand, DeleteDatasetError, GenerateSyntheticCommand, GenerateSyntheticError,
        UploadDatasetCommand, UploadDatasetError,
    },
    queries::{
        DownloadSyntheticError, DownloadSyntheticQuery, EvaluateDatasetError, EvaluateDatasetQuery,
        GetPlotError, GetPlotQuery, ListDatasetsError, ListDatasetsQuery,
    },
};

/// Multipart field carrying the uploaded CSV file.
pub const UPLOAD_FIELD: &str = "dataset";

pub fn datasets_routes() -> Router<AppContext> {
    Router::new()
        .route("/", get(list_datasets).post(upload_dataset))
        .route("/:id", delete(delete_dataset))
        .route("/:id/synthesize", post(generate_synthetic))
        .route("/:id/synthetic", get(download_synthetic))
        .route("/:id/evaluation", get(evaluate_dataset))
        .route("/:id/plots/:file", get(get_plot))
}

#[tracing::instrument(skip(ctx, user), fields(user_id = user.id))]
async fn list_datasets(
    State(ctx): State<AppContext>,
    user: CurrentUser,
) -> Result<Response, DatasetApiError> {
    let response = super::queries::list::handle(ctx, ListDatasetsQuery { owner_id: user.id }).await?;
    Ok((StatusCode::OK, Json(ApiResponse::success(response))).into_response())
}

#[tracing::instrument(skip(ctx, user, multipart), fields(user_id = user.id))]
async fn upload_dataset(
    State(ctx): State<AppContext>,
    user: CurrentUser,
    mut multipart: Multipart,
) -> Result<Response, DatasetApiError> {
    let mut upload: Option<(String, Vec<u8>)> = None;

    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }
        let filename = field.file_name().unwrap_or_default().to_string();
        let data = field.bytes().await?;
        upload = Some((filename, data.to_vec()));
    }

    let (filename, content) = upload.ok_or(DatasetApiError::MissingUpload)?;
    let command = UploadDatasetCommand {
        owner_id: user.id,
        filename,
        content,
    };

    let response = super::commands::upload::handle(ctx, command).await?;

    tracing::info!(dataset_id = response.id, name = %response.name, "Dataset uploaded via API");

    Ok((StatusCode::CREATED, Json(ApiResponse::success(response))).into_response())
}

#[tracing::instrument(skip(ctx, user), fields(user_id = user.id))]
async fn delete_dataset(
    State(ctx): State<AppContext>,
    user: CurrentUser,
    Path(id): Path<i64>,
) -> Result<Response, DatasetApiError> {
    let command = DeleteDatasetCommand {
        id,
        owner_id: user.id,
    };
    let response = super::commands::delete::handle(ctx, command).await?;

    tracing::info!(
        dataset_id = response.id,
        artifacts_removed = response.artifacts_removed,
        "Dataset deleted via API"
    );

    Ok((StatusCode::OK, Json(ApiResponse::success(response))).into_response())
}

#[tracing::instrument(skip(ctx, user, form), fields(user_id = user.id, strategy = %form.strategy))]
async fn generate_synthetic(
    State(ctx): State<AppContext>,
    user: CurrentUser,
    Path(id): Path<i64>,
    Json(form): Json<SynthesisForm>,
) -> Result<Response, DatasetApiError> {
    let command = GenerateSyntheticCommand {
        dataset_id: id,
        owner_id: user.id,
        form,
    };
    let response = super::commands::generate::handle(ctx, command).await?;
    Ok((StatusCode::OK, Json(ApiResponse::success(response))).into_response())
}

#[tracing::instrument(skip(ctx, user), fields(user_id = user.id))]
async fn download_synthetic(
    State(ctx): State<AppContext>,
    user: CurrentUser,
    Path(id): Path<i64>,
) -> Result<Response, DatasetApiError> {
    let query = DownloadSyntheticQuery {
        dataset_id: id,
        owner_id: user.id,
    };
    let response = super::queries::download_synthetic::handle(ctx, query).await?;

    let disposition = format!("attachment; filename=\"{}\"", response.filename.replace('"', ""));
    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/csv".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        response.content,
    )
        .into_response())
}

#[tracing::instrument(skip(ctx, user), fields(user_id = user.id))]
async fn evaluate_dataset(
    State(ctx): State<AppContext>,
    user: CurrentUser,
    Path(id): Path<i64>,
) -> Result<Response, DatasetApiError> {
    let query = EvaluateDatasetQuery {
        dataset_id: id,
        owner_id: user.id,
    };
    let response = super::queries::evaluate::handle(ctx, query).await?;
    Ok((StatusCode::OK, Json(ApiResponse::success(response))).into_response())
}

#[tracing::instrument(skip(ctx, user), fields(user_id = user.id))]
async fn get_plot(
    State(ctx): State<AppContext>,
    user: CurrentUser,
    Path((id, file)): Path<(i64, String)>,
) -> Result<Response, DatasetApiError> {
    let query = GetPlotQuery {
        dataset_id: id,
        owner_id: user.id,
        file,
    };
    let response = super::queries::plot::handle(ctx, query).await?;
    Ok((StatusCode::OK, [(header::CONTENT_TYPE, "image/png")], response.content).into_response())
}

#[derive(Debug)]
enum DatasetApiError {
    Multipart(MultipartError),
    MissingUpload,
    Upload(UploadDatasetError),
    Delete(DeleteDatasetError),
    Generate(GenerateSyntheticError),
    List(ListDatasetsError),
    Download(DownloadSyntheticError),
    Evaluate(EvaluateDatasetError),
    Plot(GetPlotError),
}

macro_rules! impl_from {
    ($($source:ty => $variant:ident),* $(,)?) => {
        $(impl From<$source> for DatasetApiError {
            fn from(err: $source) -> Self {
                Self::$variant(err)
            }
        })*
    };
}

impl_from! {
    MultipartError => Multipart,
    UploadDatasetError => Upload,
    DeleteDatasetError => Delete,
    GenerateSyntheticError => Generate,
    ListDatasetsError => List,
    DownloadSyntheticError => Download,
    EvaluateDatasetError => Evaluate,
    GetPlotError => Plot,
}

fn validation(message: impl Into<String>) -> AppError {
    AppError::ValidationError(message.into())
}

impl From<DatasetApiError> for AppError {
    fn from(err: DatasetApiError) -> Self {
        match err {
            DatasetApiError::Multipart(err) => validation(err.body_text()),
            DatasetApiError::MissingUpload => validation(format!(
                "No file was provided in the '{UPLOAD_FIELD}' field"
            )),

            DatasetApiError::Upload(err) => match err {
                UploadDatasetError::Filename(_)
                | UploadDatasetError::ContentRequired
                | UploadDatasetError::Validation(_) => validation(err.to_string()),
                UploadDatasetError::Registry(err) => err.into(),
                UploadDatasetError::Storage(err) => AppError::InternalError(err.to_string()),
            },

            DatasetApiError::Delete(DeleteDatasetError::Registry(err)) => err.into(),

            DatasetApiError::Generate(err) => match err {
                GenerateSyntheticError::Synthesis(err) if err.is_client_error() => {
                    validation(err.to_string())
                },
                GenerateSyntheticError::Synthesis(err) => AppError::SynthesisFailed(err.to_string()),
                GenerateSyntheticError::Registry(err) => err.into(),
                err @ GenerateSyntheticError::SourceMissing => AppError::NotFound(err.to_string()),
                GenerateSyntheticError::Storage(err) => AppError::InternalError(err.to_string()),
                GenerateSyntheticError::Worker(err) => err.into(),
            },

            DatasetApiError::List(ListDatasetsError::Registry(err)) => err.into(),

            DatasetApiError::Download(err) => match err {
                DownloadSyntheticError::Registry(err) => err.into(),
                err @ DownloadSyntheticError::NotFound => AppError::NotFound(err.to_string()),
                DownloadSyntheticError::Storage(err) => err.into(),
            },

            DatasetApiError::Evaluate(err) => match err {
                EvaluateDatasetError::Registry(err) => err.into(),
                err @ (EvaluateDatasetError::ArtifactNotFound(_) | EvaluateDatasetError::SourceMissing) => {
                    AppError::NotFound(err.to_string())
                },
                err @ EvaluateDatasetError::SchemaMismatch(_) => AppError::Conflict(err.to_string()),
                EvaluateDatasetError::Plot(err) => AppError::InternalError(err.to_string()),
                EvaluateDatasetError::Storage(err) => AppError::InternalError(err.to_string()),
                EvaluateDatasetError::Worker(err) => err.into(),
            },

            DatasetApiError::Plot(GetPlotError::Registry(err)) => err.into(),
            DatasetApiError::Plot(GetPlotError::Storage(err)) => err.into(),
        }
    }
}

impl IntoResponse for DatasetApiError {
    fn into_response(self) -> Response {
        match self {
            // Keeps 413 for oversized bodies
            DatasetApiError::Multipart(err) => {
                let error = ErrorResponse::new("VALIDATION_ERROR", err.body_text());
                (err.status(), Json(error)).into_response()
            },
            other => AppError::from(other).into_response(),
        }
    }
}
