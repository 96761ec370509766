// MIDI routes - MusicXML conversion, note-name patterns and the instrument table

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::{header, HeaderName};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use super::{ApiError, ApiResult, AppState};
use crate::midi::instruments::{self, InstrumentInfo};
use crate::midi::{musicxml_to_midi, simple_midi, MidiExportOptions, DEFAULT_PATTERN};
use crate::theory::TimeSignature;

pub const DROPPED_HEADER: HeaderName = HeaderName::from_static("x-dropped-notes");
pub const SKIPPED_HEADER: HeaderName = HeaderName::from_static("x-skipped-notes");

#[derive(Debug, Deserialize)]
pub struct ConvertRequest {
    #[serde(default, rename = "musicXML")]
    pub music_xml: String,
    #[serde(default, rename = "timeSignature")]
    pub time_signature: Option<String>,
    #[serde(default)]
    pub tempo: Option<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimpleRequest {
    #[serde(default)]
    pub pattern: Option<Vec<String>>,
    #[serde(default)]
    pub time_signature: Option<String>,
    #[serde(default)]
    pub instrument: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InstrumentDetail {
    #[serde(flatten)]
    pub info: InstrumentInfo,
    pub sample_path: String,
}

fn time_signature(text: Option<&str>) -> ApiResult<Option<TimeSignature>> {
    match text.map(str::trim).filter(|t| !t.is_empty()) {
        Some(t) => Ok(Some(TimeSignature::parse(t)?)),
        None => Ok(None),
    }
}

fn export_options(state: &AppState) -> MidiExportOptions {
    let midi = &state.config.midi;
    MidiExportOptions {
        ppq: midi.ppq,
        tempo_bpm: midi.tempo_bpm as f64,
        velocity: midi.velocity,
        ..MidiExportOptions::default()
    }
}

fn midi_response(bytes: Vec<u8>, count_header: HeaderName, count: usize) -> Response {
    (
        [
            (header::CONTENT_TYPE, "audio/midi".to_string()),
            (count_header, count.to_string()),
        ],
        bytes,
    )
        .into_response()
}

pub async fn from_musicxml(
    State(state): State<AppState>,
    payload: Result<Json<ConvertRequest>, JsonRejection>,
) -> ApiResult<Response> {
    let Json(request) = payload?;
    if request.music_xml.trim().is_empty() {
        return Err(ApiError::bad_request("MusicXML is required"));
    }
    let time = time_signature(request.time_signature.as_deref())?;
    let mut options = export_options(&state);
    if let Some(tempo) = request.tempo {
        options.tempo_bpm = tempo;
    }

    let conversion = musicxml_to_midi(&request.music_xml, time, &options)?;
    log::info!(
        "Converted MusicXML: {} notes, {} dropped, {} in {} bytes",
        conversion.notes,
        conversion.dropped,
        conversion.time,
        conversion.bytes.len()
    );
    Ok(midi_response(conversion.bytes, DROPPED_HEADER, conversion.dropped))
}

/// Quarter notes from note names; the C major octave when no pattern is given
pub async fn simple(
    State(state): State<AppState>,
    payload: Result<Json<SimpleRequest>, JsonRejection>,
) -> ApiResult<Response> {
    let Json(request) = payload?;
    let time = time_signature(request.time_signature.as_deref())?.unwrap_or_default();
    let mut options = export_options(&state);
    if let Some(name) = request.instrument.as_deref() {
        options.program = Some(
            instruments::program_for(&instruments::normalize_name(name))
                .ok_or_else(|| ApiError::bad_request(format!("Unknown instrument: {}", name)))?,
        );
    }

    let pattern: Vec<&str> = match &request.pattern {
        Some(names) => names.iter().map(String::as_str).collect(),
        None => DEFAULT_PATTERN.to_vec(),
    };
    let result = simple_midi(&pattern, time, &options)?;
    if !result.skipped.is_empty() {
        log::warn!("Skipped note names: {:?}", result.skipped);
    }
    Ok(midi_response(result.bytes, SKIPPED_HEADER, result.skipped.len()))
}

pub async fn instruments() -> Json<Vec<InstrumentInfo>> {
    Json(instruments::list_instruments())
}

pub async fn instrument(Path(name): Path<String>) -> ApiResult<Json<InstrumentDetail>> {
    let info = instruments::instrument_info(&name)
        .ok_or_else(|| ApiError::not_found(format!("Unknown instrument: {}", name)))?;
    let sample_path = instruments::sample_midi_path(&info.key, None);
    Ok(Json(InstrumentDetail { info, sample_path }))
}
