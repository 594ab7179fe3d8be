// src/handlers.rs
use crate::{AppState, errors::StudioError, models::*, presets};
use actix_multipart::Multipart;
use actix_web::{Error, HttpResponse, web};
use bytes::BytesMut;
use futures_util::TryStreamExt;
use log::info;
use serde::Deserialize;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct TargetBody {
    pub target: ExtractionTarget,
}

#[derive(Debug, Deserialize)]
pub struct OutfitBody {
    pub description: String,
}

#[derive(Debug, Deserialize)]
pub struct BackgroundBody {
    pub background: String,
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            .route("/backgrounds", web::get().to(list_backgrounds))
            .route("/sessions", web::post().to(create_session))
            .route("/sessions/{id}", web::get().to(get_session))
            .route("/sessions/{id}/images/{slot}", web::put().to(upload_image))
            .route("/sessions/{id}/images/{slot}", web::get().to(get_image))
            .route(
                "/sessions/{id}/extraction-target",
                web::put().to(set_extraction_target),
            )
            .route("/sessions/{id}/outfit", web::put().to(set_outfit))
            .route("/sessions/{id}/options", web::put().to(update_options))
            .route("/sessions/{id}/analyze", web::post().to(analyze_product))
            .route("/sessions/{id}/generate", web::post().to(generate))
            .route("/sessions/{id}/reset", web::post().to(reset_session))
            .route(
                "/sessions/{id}/background/enhance",
                web::post().to(enhance_background),
            ),
    );
}

pub async fn create_session(data: web::Data<AppState>) -> Result<HttpResponse, Error> {
    let studio = data.sessions.create();
    Ok(HttpResponse::Created().json(studio.snapshot()))
}

pub async fn get_session(
    path: web::Path<Uuid>,
    data: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    let studio = data.sessions.get(&path.into_inner())?;
    Ok(HttpResponse::Ok().json(studio.snapshot()))
}

pub async fn upload_image(
    path: web::Path<(Uuid, ImageSlot)>,
    mut payload: Multipart,
    data: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    let (session_id, slot) = path.into_inner();
    let studio = data.sessions.get(&session_id)?;

    let mut upload = None;
    while let Some(mut field) = payload.try_next().await? {
        if field.name() != "image" {
            continue;
        }

        let filename = field
            .content_disposition()
            .get_filename()
            .unwrap_or("upload")
            .to_string();
        let content_type = field.content_type().map(|ct| ct.to_string());

        let mut image_data = BytesMut::new();
        while let Some(chunk) = field.try_next().await? {
            if image_data.len() + chunk.len() > data.max_upload_bytes {
                return Err(StudioError::Validation(format!(
                    "Image exceeds the {} byte upload limit",
                    data.max_upload_bytes
                ))
                .into());
            }
            image_data.extend_from_slice(&chunk);
        }

        upload = Some(data.image_processor.accept_upload(
            filename,
            content_type,
            image_data.freeze(),
        )?);
        break;
    }

    let image = upload.ok_or_else(|| {
        StudioError::Validation("Multipart field 'image' is missing".to_string())
    })?;
    info!(
        "session {}: {:?} image {} ({}x{})",
        session_id, slot, image.filename, image.width, image.height
    );
    studio.select_image(slot, image)?;

    Ok(HttpResponse::Ok().json(studio.snapshot()))
}

pub async fn get_image(
    path: web::Path<(Uuid, ImageSlot)>,
    data: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    let (session_id, slot) = path.into_inner();
    let studio = data.sessions.get(&session_id)?;
    let image = studio
        .image(slot)
        .ok_or_else(|| StudioError::NotFound(format!("No {:?} image uploaded", slot)))?;

    Ok(HttpResponse::Ok()
        .content_type(image.mime_type.as_str())
        .body(image.bytes.clone()))
}

pub async fn set_extraction_target(
    path: web::Path<Uuid>,
    body: web::Json<TargetBody>,
    data: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    let studio = data.sessions.get(&path.into_inner())?;
    studio.set_extraction_target(body.target)?;
    Ok(HttpResponse::Ok().json(studio.snapshot()))
}

pub async fn set_outfit(
    path: web::Path<Uuid>,
    body: web::Json<OutfitBody>,
    data: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    let studio = data.sessions.get(&path.into_inner())?;
    studio.set_outfit_description(body.into_inner().description)?;
    Ok(HttpResponse::Ok().json(studio.snapshot()))
}

pub async fn update_options(
    path: web::Path<Uuid>,
    body: web::Json<OptionsUpdate>,
    data: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    let studio = data.sessions.get(&path.into_inner())?;
    studio.update_options(body.into_inner())?;
    Ok(HttpResponse::Ok().json(studio.snapshot()))
}

pub async fn analyze_product(
    path: web::Path<Uuid>,
    data: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    let studio = data.sessions.get(&path.into_inner())?;
    studio.analyze_product().await?;
    Ok(HttpResponse::Ok().json(studio.snapshot()))
}

/// Starts a run and answers straight away; clients poll the session to follow it.
pub async fn generate(
    path: web::Path<Uuid>,
    data: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    let studio = data.sessions.get(&path.into_inner())?;
    let request = studio.begin_generation()?;

    let worker = studio.clone();
    actix_web::rt::spawn(async move {
        worker.run_generation(request).await;
    });

    Ok(HttpResponse::Accepted().json(studio.snapshot()))
}

pub async fn reset_session(
    path: web::Path<Uuid>,
    data: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    let studio = data.sessions.get(&path.into_inner())?;
    studio.reset();
    Ok(HttpResponse::Ok().json(studio.snapshot()))
}

pub async fn enhance_background(
    path: web::Path<Uuid>,
    body: web::Json<BackgroundBody>,
    data: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    let studio = data.sessions.get(&path.into_inner())?;
    let enhanced_background = studio.enhance_background(&body.background).await?;
    Ok(HttpResponse::Ok().json(EnhancedBackground {
        enhanced_background,
    }))
}

pub async fn list_backgrounds() -> HttpResponse {
    HttpResponse::Ok().json(presets::BACKGROUND_SUGGESTIONS)
}
