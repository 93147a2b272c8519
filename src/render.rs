// Map rendering: writes a merged trace into a self-contained HTML page.
// The flat map uses Leaflet; the terrain map uses deck.gl and needs
// altitudes on every point.

use anyhow::{Context, Result};
use serde_json::{json, Value};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::model::MergedTrace;

const FLAT_TEMPLATE: &str = r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<title>__TITLE__</title>
<link rel="stylesheet" href="https://unpkg.com/leaflet@1.9.4/dist/leaflet.css">
<script src="https://unpkg.com/leaflet@1.9.4/dist/leaflet.js"></script>
<style>html, body, #map { height: 100%; margin: 0; }</style>
</head>
<body>
<div id="map"></div>
<script>
const track = __TRACK__;
const map = L.map('map');
const osm = L.tileLayer('https://{s}.tile.openstreetmap.org/{z}/{x}/{y}.png', {
  maxZoom: 19, attribution: '&copy; OpenStreetMap contributors'
}).addTo(map);
const imagery = L.tileLayer('https://server.arcgisonline.com/ArcGIS/rest/services/World_Imagery/MapServer/tile/{z}/{y}/{x}', {
  attribution: 'Tiles &copy; Esri'
});
const google = (lyrs, attribution) => L.tileLayer(`https://mt1.google.com/vt/lyrs=${lyrs}&x={x}&y={y}&z={z}`, {
  maxZoom: 20, attribution
});
L.control.layers({
  'OpenStreetMap': osm,
  'Esri World Imagery': imagery,
  'Google Satellite': google('s', 'Google'),
  'Google Maps': google('m', 'Google Maps'),
  'Google Hybrid (Satellite + Labels)': google('y', 'Google')
}).addTo(map);
const line = L.polyline(track.path, { color: 'blue', weight: 2.5 }).addTo(map);
map.fitBounds(line.getBounds());
const pin = (color) => L.divIcon({
  className: '', html: `<div style="width:14px;height:14px;border-radius:7px;background:${color};border:2px solid white"></div>`
});
L.marker(track.start, { icon: pin('green') }).bindPopup('Start').addTo(map);
L.marker(track.end, { icon: pin('red') }).bindPopup('End').addTo(map);
for (const stop of track.stops) {
  L.marker(stop.position, { icon: pin('orange') }).bindPopup(stop.label).addTo(map);
}

// Playback: a marker walks the track at 60x recorded time; gaps longer than
// a minute (pauses between legs) take one second.
const mover = L.circleMarker(track.start, { radius: 6, color: 'red', fillColor: 'blue', fillOpacity: 0.8 }).addTo(map);
const clock = L.control({ position: 'bottomleft' });
clock.onAdd = () => {
  const div = L.DomUtil.create('div', 'playback');
  div.innerHTML = '<button id="play">Pause</button> <span id="clock"></span>';
  L.DomEvent.disableClickPropagation(div);
  return div;
};
clock.addTo(map);
const label = document.getElementById('clock');
const button = document.getElementById('play');
const fmt = (ms) => new Date(ms).toISOString().replace('T', ' ').slice(0, 19);
let frame = 0;
let playing = true;
let timer = null;
const step = () => {
  mover.setLatLng(track.path[frame]);
  label.textContent = fmt(track.times[frame]);
  if (frame + 1 >= track.path.length) {
    playing = false;
    button.textContent = 'Replay';
    return;
  }
  const gap = track.times[frame + 1] - track.times[frame];
  frame += 1;
  timer = setTimeout(step, Math.min(Math.max(gap / 60, 10), 1000));
};
button.onclick = () => {
  if (playing) {
    clearTimeout(timer);
    playing = false;
    button.textContent = 'Play';
  } else {
    if (frame + 1 >= track.path.length) frame = 0;
    playing = true;
    button.textContent = 'Pause';
    step();
  }
};
step();
</script>
</body>
</html>
"#;

const TERRAIN_TEMPLATE: &str = r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<title>__TITLE__</title>
<script src="https://unpkg.com/deck.gl@8.9.35/dist.min.js"></script>
<script src="https://unpkg.com/maplibre-gl@3.6.2/dist/maplibre-gl.js"></script>
<link href="https://unpkg.com/maplibre-gl@3.6.2/dist/maplibre-gl.css" rel="stylesheet">
<style>html, body { height: 100%; margin: 0; }</style>
</head>
<body>
<script>
const track = __TRACK__;
new deck.DeckGL({
  mapStyle: 'https://basemaps.cartocdn.com/gl/positron-gl-style/style.json',
  initialViewState: {
    longitude: track.start[0], latitude: track.start[1], zoom: 14, pitch: 45, bearing: 0
  },
  controller: true,
  getTooltip: ({ object }) => object && object.label,
  layers: [
    new deck.PathLayer({
      id: 'track', data: [{ path: track.path, label: track.title }],
      getPath: d => d.path, getColor: [0, 128, 200], getWidth: 5, widthMinPixels: 2, pickable: true
    }),
    new deck.ScatterplotLayer({
      id: 'markers', data: track.markers,
      getPosition: d => d.position, getFillColor: d => d.color, getRadius: 200, radiusMinPixels: 5, pickable: true
    })
  ]
});
</script>
</body>
</html>
"#;

/// Map flavours the visualization commands can produce.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MapStyle {
    Flat,
    Terrain,
}

impl MapStyle {
    pub fn file_name(self) -> &'static str {
        match self {
            MapStyle::Flat => "merged_map.html",
            MapStyle::Terrain => "merged_map_3d.html",
        }
    }
}

fn title(trace: &MergedTrace) -> String {
    format!("Merged track of {} activities", trace.activity_ids().len())
}

/// Stops that get a marker: the retained stops minus the one at the very
/// start of the track, which the start marker already covers.
pub fn marked_stops(trace: &MergedTrace) -> Vec<(usize, usize)> {
    trace
        .boundaries()
        .iter()
        .copied()
        .enumerate()
        .filter(|(pos, offset)| *offset != 0 && !trace.dropped_stop_indices().contains(pos))
        .collect()
}

fn flat_data(trace: &MergedTrace) -> Value {
    let points = trace.points();
    let path: Vec<[f64; 2]> = points.iter().map(|p| [p.latitude, p.longitude]).collect();
    let times: Vec<i64> = points.iter().map(|p| p.timestamp_ms).collect();
    let stops: Vec<Value> = marked_stops(trace)
        .into_iter()
        .map(|(pos, offset)| {
            let p = &points[offset];
            json!({"label": format!("Stop {}", pos), "position": [p.latitude, p.longitude]})
        })
        .collect();
    json!({
        "title": title(trace),
        "path": path,
        "start": path.first(),
        "end": path.last(),
        "times": times,
        "stops": stops,
    })
}

fn terrain_data(trace: &MergedTrace) -> Value {
    let points = trace.points();
    let path: Vec<[f64; 3]> = points
        .iter()
        .map(|p| [p.longitude, p.latitude, p.altitude_m.unwrap_or(0.0)])
        .collect();
    let mut markers = Vec::new();
    if let (Some(first), Some(last)) = (path.first(), path.last()) {
        markers.push(json!({"position": first, "color": [0, 255, 0], "label": "Start"}));
        markers.push(json!({"position": last, "color": [255, 0, 0], "label": "End"}));
    }
    for (pos, offset) in marked_stops(trace) {
        markers.push(json!({
            "position": path[offset],
            "color": [255, 165, 0],
            "label": format!("Stop {}", pos),
        }));
    }
    json!({
        "title": title(trace),
        "path": path,
        "start": path.first(),
        "markers": markers,
    })
}

/// Render `trace` into `dir` and return the written file.
pub fn write_map(trace: &MergedTrace, style: MapStyle, dir: &Path) -> Result<PathBuf> {
    if trace.points().is_empty() {
        anyhow::bail!("No GPS data to visualize");
    }
    if style == MapStyle::Terrain && !trace.has_altitude() {
        anyhow::bail!("Terrain map needs elevation on every point");
    }
    let (template, data) = match style {
        MapStyle::Flat => (FLAT_TEMPLATE, flat_data(trace)),
        MapStyle::Terrain => (TERRAIN_TEMPLATE, terrain_data(trace)),
    };
    let html = template
        .replace("__TITLE__", &title(trace))
        .replace("__TRACK__", &data.to_string());

    fs::create_dir_all(dir).with_context(|| format!("Failed to create {}", dir.display()))?;
    let path = dir.join(style.file_name());
    fs::write(&path, html).with_context(|| format!("Failed to write {}", path.display()))?;
    info!(path = %path.display(), ?style, points = trace.points().len(), "map written");
    Ok(path)
}
