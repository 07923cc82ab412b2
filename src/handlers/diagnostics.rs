use crate::{auth, models::{DiagnosticsResponse, ErrorResponse}, AppState};
use axum::{extract::{State, Extension}, http::StatusCode, Json};
use std::sync::{Mutex, OnceLock};
use sysinfo::System;
use tracing::info;

static SYSTEM_MONITOR: OnceLock<Mutex<System>> = OnceLock::new();

/// Report room, connection and process figures
pub async fn diagnostics(
    State(state): State<AppState>,
    Extension(identity): Extension<auth::Identity>,
) -> Result<(StatusCode, Json<DiagnosticsResponse>), (StatusCode, Json<ErrorResponse>)> {

    // Only cloud admins may look at the whole server
    auth::ensure_cloud_admin(&identity)?;

    // Aggregate diagnostics from the registry
    let stats = state.registry.stats().await;
    let broadcast = state.registry.broadcast_stats();

    // System stats
    let (cpu_usage, memory_alloc, memory_free, memory_total) = {
        let sys_lock = SYSTEM_MONITOR.get_or_init(|| {
            Mutex::new(System::new_all())
        });
        match sys_lock.lock() {
            Ok(mut sys) => {
                sys.refresh_cpu();
                sys.refresh_memory();
                (
                    sys.global_cpu_info().cpu_usage(),
                    sys.used_memory(),
                    sys.free_memory(),
                    sys.total_memory(),
                )
            }
            Err(_) => (0.0, 0, 0, 0)
        }
    };

    info!(
        "Diagnostics: CPU: {:.2}%, Mem: {}/{} MB (Free: {} MB), Conn: {}, Rooms: {}",
        cpu_usage,
        memory_alloc / 1024 / 1024,
        memory_total / 1024 / 1024,
        memory_free / 1024 / 1024,
        stats.connections,
        stats.rooms
    );

    Ok((
        StatusCode::OK,
        Json(DiagnosticsResponse {
            n_conn: stats.connections as u32,
            n_rooms: stats.rooms as u32,
            n_objects: stats.objects as u32,
            n_comments: stats.comments as u32,
            messages_sent: broadcast.sent(),
            messages_dropped: broadcast.dropped(),
            cpu_usage,
            memory_alloc,
            memory_total,
            memory_free,
        }),
    ))
}
