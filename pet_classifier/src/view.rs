use crate::prediction::{PredictedClass, PredictionResponse};
use crate::upload::UploadState;
use serde::Serialize;
use std::fmt::Write;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictionView {
    pub predicted_class: PredictedClass,
    pub emoji: &'static str,
    pub headline: String,
    pub confidence_percent: f64,
    pub confidence_text: String,
}

impl From<&PredictionResponse> for PredictionView {
    fn from(prediction: &PredictionResponse) -> Self {
        let confidence_percent = prediction.confidence * 100.0;
        Self {
            predicted_class: prediction.predicted_class,
            emoji: prediction.predicted_class.emoji(),
            headline: format!("It's a {}!", prediction.predicted_class.title()),
            confidence_percent,
            confidence_text: format!("{:.1}% confident", confidence_percent),
        }
    }
}

/// JSON shape served on `/state` for the page script.
#[derive(Debug, Clone, Serialize)]
pub struct StateView {
    pub server_status: &'static str,
    pub file_name: Option<String>,
    pub preview: Option<String>,
    pub is_drag_over: bool,
    pub is_loading: bool,
    pub error_message: Option<String>,
    pub show_error_animation: bool,
    pub prediction: Option<PredictionView>,
}

impl From<&UploadState> for StateView {
    fn from(state: &UploadState) -> Self {
        Self {
            server_status: state.server_status.as_str(),
            file_name: state.selected_file.as_ref().map(|f| f.name.clone()),
            preview: state.selected_image.clone(),
            is_drag_over: state.is_drag_over,
            is_loading: state.is_loading,
            error_message: state.error_message.clone(),
            show_error_animation: state.show_error_animation,
            prediction: state.prediction.as_ref().map(PredictionView::from),
        }
    }
}

const TIPS: [&str; 3] = [
    "Use clear, well-lit images",
    "Make sure the cat or dog is the main subject",
    "Images should be at least 128x128 pixels",
];

pub fn render_page(state: &UploadState) -> String {
    let mut html = String::with_capacity(4096);
    html.push_str(PAGE_HEAD);

    let _ = write!(
        html,
        r#"<header><h1>🐱 Cats &amp; Dogs Classifier 🐶</h1>
<p>Upload an image and let AI determine if it's a cat or dog!</p>
<p class="status">{}</p>
<form method="post" action="/health/refresh"><button type="submit" class="link">Refresh status</button></form>
</header>
"#,
        html_escape::encode_text(state.server_status.as_str())
    );

    let _ = write!(
        html,
        r#"<form id="upload-form" method="post" action="/upload" enctype="multipart/form-data">
<div id="drop-zone" class="drop-zone{}">
<label for="file-upload">Drag and drop your image here, or <span class="link">browse</span></label>
<input id="file-upload" name="image" type="file" accept="image/*">
<p class="hint">PNG, JPG, GIF up to 10MB</p>
</div>
</form>
"#,
        if state.is_drag_over { " drag-over" } else { "" }
    );

    if let Some(preview) = &state.selected_image {
        let _ = write!(
            html,
            r#"<section class="card"><h3>Selected Image</h3>
<img class="preview" src="{}" alt="Selected image">
<form method="post" action="/predict"><button id="predict" type="submit"{}>{}</button></form>
<form method="post" action="/predict/preview"><button type="submit" class="secondary"{}>Predict from preview</button></form>
<form method="post" action="/clear"><button type="submit" class="secondary">Clear Image</button></form>
</section>
"#,
            html_escape::encode_double_quoted_attribute(preview),
            if state.is_loading { " disabled" } else { "" },
            if state.is_loading { "Analyzing..." } else { "🔮 Predict" },
            if state.is_loading { " disabled" } else { "" },
        );
    }

    if let Some(prediction) = &state.prediction {
        let view = PredictionView::from(prediction);
        let _ = write!(
            html,
            r#"<section class="card result {class}"><h3>Prediction Result</h3>
<div class="emoji">{emoji}</div>
<h4>{headline}</h4>
<p>Confidence Level</p>
<div class="bar"><div class="fill" style="width: {width:.1}%"></div></div>
<p class="hint">{text}</p>
</section>
"#,
            class = view.predicted_class,
            emoji = view.emoji,
            headline = html_escape::encode_text(&view.headline),
            width = view.confidence_percent,
            text = view.confidence_text,
        );
    }

    if let Some(message) = &state.error_message {
        let _ = write!(
            html,
            r#"<section class="error{}"><h3>Error</h3><p>{}</p></section>
"#,
            if state.show_error_animation { " shake" } else { "" },
            html_escape::encode_text(message)
        );
    }

    html.push_str("<section class=\"card\"><h3>💡 Tips for best results</h3><ul>");
    for tip in TIPS {
        let _ = write!(html, "<li>{}</li>", tip);
    }
    html.push_str("</ul></section>\n");

    html.push_str(PAGE_TAIL);
    html
}

const PAGE_HEAD: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="UTF-8">
<meta name="viewport" content="width=device-width, initial-scale=1.0">
<title>Cats &amp; Dogs Classifier</title>
<style>
body { font-family: sans-serif; max-width: 56rem; margin: 0 auto; padding: 2rem; background: #eef2ff; }
header { text-align: center; }
.status { color: #6b7280; font-size: 0.9rem; }
.drop-zone { border: 2px dashed #d1d5db; border-radius: 0.5rem; padding: 3rem; text-align: center; margin: 2rem 0; }
.drop-zone.drag-over { border-color: #60a5fa; background: #eff6ff; }
#file-upload { display: none; }
.link { color: #2563eb; cursor: pointer; background: none; border: none; }
.hint { color: #6b7280; font-size: 0.8rem; }
.card { background: white; border-radius: 0.5rem; padding: 1.5rem; margin-bottom: 2rem; }
.preview { width: 100%; max-height: 16rem; object-fit: cover; border-radius: 0.5rem; }
button { padding: 0.75rem 1.5rem; border-radius: 0.5rem; border: none; margin-top: 0.75rem; background: #2563eb; color: white; font-weight: bold; }
button.secondary { background: #d1d5db; color: #374151; }
button:disabled { background: #9ca3af; }
.result { text-align: center; }
.emoji { font-size: 4rem; }
.result.cat h4 { color: #9333ea; }
.result.dog h4 { color: #ea580c; }
.bar { background: #e5e7eb; border-radius: 9999px; height: 0.75rem; }
.fill { height: 0.75rem; border-radius: 9999px; background: #a855f7; }
.result.dog .fill { background: #f97316; }
.error { background: #fef2f2; border: 1px solid #fecaca; border-radius: 0.5rem; padding: 1rem; color: #b91c1c; margin-bottom: 2rem; }
.shake { animation: shake 0.82s; }
@keyframes shake { 10%, 90% { transform: translateX(-1px); } 20%, 80% { transform: translateX(2px); } 30%, 50%, 70% { transform: translateX(-4px); } 40%, 60% { transform: translateX(4px); } }
</style>
</head>
<body>
"#;

const PAGE_TAIL: &str = r#"<script>
const zone = document.getElementById("drop-zone");
const input = document.getElementById("file-upload");
const post = (path, body) => fetch(path, { method: "POST", body });
zone.addEventListener("click", () => input.click());
input.addEventListener("change", () => {
  if (input.files.length > 0) document.getElementById("upload-form").submit();
});
zone.addEventListener("dragover", (e) => {
  e.preventDefault();
  if (!zone.classList.contains("drag-over")) {
    zone.classList.add("drag-over");
    post("/drag/over");
  }
});
zone.addEventListener("dragleave", (e) => {
  e.preventDefault();
  zone.classList.remove("drag-over");
  post("/drag/leave");
});
zone.addEventListener("drop", (e) => {
  e.preventDefault();
  zone.classList.remove("drag-over");
  const data = new FormData();
  const file = e.dataTransfer.files[0];
  if (file) data.append("image", file);
  post("/drop", data).then(() => window.location.reload());
});
for (const form of document.querySelectorAll('form[action^="/predict"]')) {
  form.addEventListener("submit", () => {
    const button = form.querySelector("button");
    button.disabled = true;
    button.textContent = "Analyzing...";
  });
}
</script>
</body>
</html>
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image_file::ImageFile;
    use crate::upload::ServerStatus;

    fn cat(confidence: f64) -> PredictionResponse {
        PredictionResponse {
            predicted_class: PredictedClass::Cat,
            confidence,
            raw_prediction: 1.0 - confidence,
        }
    }

    #[test]
    fn test_prediction_view() {
        let view = PredictionView::from(&cat(0.92));

        assert_eq!(view.headline, "It's a Cat!");
        assert_eq!(view.emoji, "🐱");
        assert_eq!(view.confidence_text, "92.0% confident");

        let dog = PredictionView::from(&PredictionResponse {
            predicted_class: PredictedClass::Dog,
            confidence: 0.5,
            raw_prediction: 0.5,
        });
        assert_eq!(dog.headline, "It's a Dog!");
        assert_eq!(dog.confidence_text, "50.0% confident");
    }

    #[test]
    fn test_render_result() {
        let mut state = UploadState::default();
        state.prediction = Some(cat(0.92));

        let html = render_page(&state);
        assert!(html.contains("It's a Cat!"));
        assert!(html.contains("92.0% confident"));
        assert!(html.contains("Checking server..."));
    }

    #[test]
    fn test_render_escapes_error_and_flags() {
        let mut state = UploadState::default();
        state.error_message = Some("<script>alert(1)</script>".to_string());
        state.show_error_animation = true;
        state.is_drag_over = true;
        state.server_status = ServerStatus::Offline;

        let html = render_page(&state);
        assert!(html.contains("&lt;script&gt;alert(1)&lt;/script&gt;"));
        assert!(html.contains(r#"class="error shake""#));
        assert!(html.contains("drop-zone drag-over"));
        assert!(html.contains("Server offline ❌"));
    }

    #[test]
    fn test_render_loading_disables_predict() {
        let mut state = UploadState::default();
        state.selected_file = Some(ImageFile::new("a.png", "image/png", vec![1u8]));
        state.selected_image = Some("data:image/png;base64,AQ==".to_string());
        state.is_loading = true;

        let html = render_page(&state);
        assert!(html.contains(r#"src="data:image/png;base64,AQ==""#));
        assert!(html.contains("Analyzing..."));
        assert!(!html.contains("🔮 Predict"));
    }

    #[test]
    fn test_state_view_json() {
        let mut state = UploadState::default();
        state.selected_file = Some(ImageFile::new("a.png", "image/png", vec![1u8]));
        state.prediction = Some(cat(0.92));
        state.server_status = ServerStatus::Ready;

        let json = serde_json::to_value(StateView::from(&state)).unwrap();
        assert_eq!(json["server_status"], "Server ready ✅");
        assert_eq!(json["file_name"], "a.png");
        assert_eq!(json["prediction"]["predicted_class"], "cat");
        assert_eq!(json["prediction"]["confidence_text"], "92.0% confident");
        assert_eq!(json["is_loading"], false);
    }
}
