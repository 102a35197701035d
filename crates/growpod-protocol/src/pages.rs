//! Static HTML pages.

/// `/` landing page.
pub const HOME_PAGE: &str = r#"<!DOCTYPE html>
<html>
<head>
<meta charset="UTF-8">
<meta name="viewport" content="width=device-width, initial-scale=1.0">
<title>GrowPod Camera</title>
<style>
body { font-family: Arial, sans-serif; margin: 40px; background: #f5f5f5; }
h1 { color: #333; }
.card { background: white; padding: 20px; border-radius: 8px; box-shadow: 0 2px 4px rgba(0,0,0,0.1); max-width: 600px; }
.info { background: #e8f5e9; padding: 10px; border-radius: 4px; margin: 10px 0; }
a.button { display: inline-block; padding: 10px 20px; margin: 5px 0; background: #4CAF50; color: white; text-decoration: none; border-radius: 4px; }
a.button:hover { background: #45a049; }
</style>
</head>
<body>
<div class="card">
<h1>GrowPod ESP32-S3 Camera</h1>
<div class="info" id="info">Loading camera status...</div>
<p><a class="button" href="/preview">Live Preview</a></p>
<p><a class="button" href="/settings">Camera Settings</a></p>
<p><a class="button" href="/capture">Capture Image</a></p>
<p><a class="button" href="/status">Status (JSON)</a></p>
</div>
<script>
fetch('/status')
  .then(function (r) { return r.json(); })
  .then(function (s) {
    document.getElementById('info').innerHTML =
      '<p><strong>Camera:</strong> ' + s.camera + '</p>' +
      '<p><strong>Resolution:</strong> ' + s.resolution + ' (' + s.width + 'x' + s.height + ')</p>' +
      '<p><strong>Format:</strong> ' + s.format + '</p>';
  })
  .catch(function () {
    document.getElementById('info').textContent = 'Status unavailable';
  });
</script>
</body>
</html>
"#;

/// `/preview` page: embeds the MJPEG stream and reconnects when it drops.
pub const PREVIEW_PAGE: &str = r#"<!DOCTYPE html>
<html>
<head>
<meta charset="UTF-8">
<meta name="viewport" content="width=device-width, initial-scale=1.0">
<title>Live Preview - GrowPod</title>
<style>
body { font-family: Arial, sans-serif; margin: 20px; background: #f5f5f5; text-align: center; }
.card { background: white; padding: 20px; border-radius: 8px; box-shadow: 0 2px 4px rgba(0,0,0,0.1); max-width: 700px; margin: 0 auto; }
.video { margin: 20px auto; max-width: 640px; border-radius: 4px; overflow: hidden; }
img { width: 100%; height: auto; display: block; }
.button { display: inline-block; padding: 12px 24px; margin: 8px; background: #4CAF50; color: white; text-decoration: none; border: none; border-radius: 4px; font-size: 16px; cursor: pointer; }
.button.secondary { background: #2196F3; }
.note { color: #666; font-style: italic; }
</style>
</head>
<body>
<div class="card">
<h1>Live Camera Preview</h1>
<p class="note">Streaming at VGA (640x480)</p>
<div class="video"><img id="stream" src="/stream?quality=10" alt="Loading stream..."></div>
<button class="button" onclick="captureStill()">Capture High-Res Image</button>
<p class="note" id="note"></p>
<p><a class="button secondary" href="/">Back to Home</a></p>
</div>
<script>
var stream = document.getElementById('stream');
function captureStill() {
  document.getElementById('note').textContent = 'Capturing full resolution image...';
  window.open('/capture', '_blank');
  setTimeout(function () {
    document.getElementById('note').textContent = 'Image opened in new tab';
  }, 1000);
}
stream.onerror = function () {
  setTimeout(function () {
    stream.src = '/stream?quality=10&t=' + Date.now();
  }, 2000);
};
</script>
</body>
</html>
"#;

/// `/settings` page: pre-fills from `/status`, applies via five `/control`
/// calls.
pub const SETTINGS_PAGE: &str = r#"<!DOCTYPE html>
<html>
<head>
<meta charset="UTF-8">
<meta name="viewport" content="width=device-width, initial-scale=1.0">
<title>Camera Settings - GrowPod</title>
<style>
body { font-family: Arial, sans-serif; margin: 20px; background: #f5f5f5; }
h1 { color: #333; text-align: center; }
.card { background: white; padding: 30px; border-radius: 8px; box-shadow: 0 2px 4px rgba(0,0,0,0.1); max-width: 600px; margin: 0 auto; }
.field { margin: 20px 0; }
.field label { display: block; font-weight: bold; margin-bottom: 8px; color: #555; }
.field select, .field input { width: 100%; padding: 8px; font-size: 14px; }
.value { margin-left: 10px; color: #4CAF50; }
.button { display: inline-block; padding: 12px 24px; margin: 8px; background: #4CAF50; color: white; text-decoration: none; border: none; border-radius: 4px; font-size: 16px; cursor: pointer; }
.button.secondary { background: #2196F3; }
.note { text-align: center; color: #666; font-style: italic; }
.actions { text-align: center; margin-top: 30px; }
</style>
</head>
<body>
<div class="card">
<h1>Camera Settings</h1>
<p class="note" id="loading">Loading current settings...</p>
<div id="form" style="display:none;">
<div class="field">
<label for="aec">Auto Exposure</label>
<select id="aec"><option value="1">On (automatic)</option><option value="0">Off (manual)</option></select>
</div>
<div class="field">
<label for="aec_value">Manual Exposure <span class="value" id="aec_value_out">300</span></label>
<input type="range" id="aec_value" min="0" max="1200" value="300">
</div>
<div class="field">
<label for="ae_level">Exposure Compensation <span class="value" id="ae_level_out">0</span></label>
<input type="range" id="ae_level" min="-2" max="2" step="1" value="0">
</div>
<hr>
<div class="field">
<label for="gain_ctrl">Auto Gain</label>
<select id="gain_ctrl"><option value="1">On (automatic)</option><option value="0">Off (manual)</option></select>
</div>
<div class="field">
<label for="agc_gain">Manual Gain <span class="value" id="agc_gain_out">0</span></label>
<input type="range" id="agc_gain" min="0" max="30" value="0">
</div>
<p class="note" id="note"></p>
<div class="actions">
<button class="button" onclick="applySettings()">Apply and Return Home</button>
<a class="button secondary" href="/">Cancel</a>
</div>
</div>
</div>
<script>
var sliders = ['aec_value', 'ae_level', 'agc_gain'];
function show(id, value) {
  document.getElementById(id).value = value;
  if (sliders.indexOf(id) >= 0) {
    document.getElementById(id + '_out').textContent = value;
  }
}
sliders.forEach(function (id) {
  document.getElementById(id).oninput = function () {
    document.getElementById(id + '_out').textContent = this.value;
  };
});
function loadSettings() {
  fetch('/status')
    .then(function (r) { return r.json(); })
    .then(function (s) {
      if (s.aec !== undefined) {
        show('aec', s.aec ? '1' : '0');
        show('aec_value', s.aec_value);
        show('ae_level', s.ae_level);
        show('gain_ctrl', s.gain_ctrl ? '1' : '0');
        show('agc_gain', s.agc_gain);
      }
      document.getElementById('loading').style.display = 'none';
      document.getElementById('form').style.display = 'block';
    })
    .catch(function () {
      document.getElementById('loading').textContent = 'Could not load settings, showing defaults.';
      document.getElementById('form').style.display = 'block';
    });
}
function applySettings() {
  var note = document.getElementById('note');
  note.textContent = 'Applying settings...';
  var vars = ['aec', 'aec_value', 'ae_level', 'gain_ctrl', 'agc_gain'];
  Promise.all(vars.map(function (v) {
    var val = document.getElementById(v).value;
    return fetch('/control?var=' + v + '&val=' + encodeURIComponent(val)).then(function (r) {
      if (!r.ok) { throw new Error(v + ': HTTP ' + r.status); }
    });
  })).then(function () {
    note.textContent = 'Settings applied. Returning home...';
    setTimeout(function () { window.location.href = '/'; }, 1500);
  }).catch(function (err) {
    note.textContent = 'Error applying settings (' + err.message + ')';
  });
}
window.onload = loadSettings;
</script>
</body>
</html>
"#;
