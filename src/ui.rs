use crate::models::{ActivityKind, ActivityView, DayView};

pub fn render_index(day: &DayView) -> String {
    let cards = if day.activities.is_empty() {
        r#"<p class="empty">No activities yet. Create one with POST /api/activities.</p>"#.to_string()
    } else {
        day.activities
            .iter()
            .map(|view| render_card(view, day.locked))
            .collect::<Vec<_>>()
            .join("\n")
    };

    let (lock_action, lock_label) = if day.locked {
        ("/unlock", "Unlock day")
    } else {
        ("/lock", "Lock day")
    };

    INDEX_HTML
        .replace("{{DATE}}", &day.date.format("%A %d %B %Y").to_string())
        .replace("{{DONE}}", &day.status.done.to_string())
        .replace("{{TOTAL}}", &day.status.total.to_string())
        .replace("{{PERCENT}}", &day.status.percent.to_string())
        .replace("{{LOCK_ACTION}}", lock_action)
        .replace("{{LOCK_LABEL}}", lock_label)
        .replace("{{CARDS}}", &cards)
}

fn render_card(view: &ActivityView, locked: bool) -> String {
    let activity = &view.activity;
    let state = match (view.done, locked) {
        (true, _) => "done",
        (false, true) => "missed",
        (false, false) => "open",
    };
    let disabled = if locked { " disabled" } else { "" };
    let schedule = activity
        .scheduled_at
        .as_deref()
        .map(|time| format!(r#"<span class="time">{}</span>"#, escape(time)))
        .unwrap_or_default();

    let control = match activity.kind {
        ActivityKind::Boolean => format!(
            r#"<form method="post" action="/toggle/{id}"><button{disabled}>{label}</button></form>"#,
            id = activity.id,
            label = if view.checked { "Undo" } else { "Done" },
        ),
        ActivityKind::Duration => format!(
            r#"<form method="post" action="/progress/{id}">
        <input type="range" name="value" min="0" max="{max}" value="{value}"{disabled} />
        <span>{value}/{max} min</span>
        <button{disabled}>Save</button>
      </form>"#,
            id = activity.id,
            max = activity.target_minutes,
            value = activity.progress.min(activity.target_minutes),
        ),
    };

    format!(
        r#"<li class="card {state}">
      <strong>{name}</strong>{schedule}
      {control}
    </li>"#,
        name = escape(&activity.name),
    )
}

fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}

const INDEX_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="UTF-8" />
  <meta name="viewport" content="width=device-width, initial-scale=1.0" />
  <title>Today</title>
  <style>
    :root {
      --bg: #1e1e1e;
      --card: #2a2a2a;
      --ink: #ece7dc;
      --muted: #9a958c;
      --done: #4caf7a;
      --missed: #c0504d;
      --accent: #c9a45c;
    }

    body {
      margin: 0;
      min-height: 100vh;
      background: var(--bg);
      color: var(--ink);
      font-family: "Trebuchet MS", sans-serif;
      display: grid;
      place-items: start center;
      padding: 32px 18px;
    }

    main {
      width: min(760px, 100%);
      display: grid;
      gap: 20px;
    }

    header {
      display: flex;
      align-items: center;
      justify-content: space-between;
      gap: 12px;
    }

    h1 {
      margin: 0;
      font-size: 1.6rem;
      font-family: Georgia, serif;
    }

    .progress {
      height: 8px;
      border-radius: 999px;
      background: rgba(0, 0, 0, 0.35);
      overflow: hidden;
    }

    .progress div {
      height: 100%;
      background: var(--accent);
    }

    ul {
      list-style: none;
      margin: 0;
      padding: 0;
      display: grid;
      grid-template-columns: repeat(auto-fill, minmax(170px, 1fr));
      gap: 14px;
    }

    .card {
      background: var(--card);
      border: 1px solid rgba(255, 255, 255, 0.08);
      border-radius: 16px;
      padding: 14px;
      display: grid;
      gap: 10px;
    }

    .card.done { border-color: var(--done); }
    .card.missed { border-color: var(--missed); }
    .time, .empty, .summary { color: var(--muted); font-size: 0.9rem; }
    .time { margin-left: 8px; }
    input[type=range] { width: 100%; }

    button {
      border: none;
      border-radius: 999px;
      padding: 8px 14px;
      background: var(--accent);
      color: var(--bg);
      cursor: pointer;
    }

    button[disabled] { opacity: 0.4; cursor: not-allowed; }
  </style>
</head>
<body>
  <main>
    <header>
      <div>
        <h1>{{DATE}}</h1>
        <p class="summary">{{DONE}}/{{TOTAL}} done, {{PERCENT}}%</p>
      </div>
      <form method="post" action="{{LOCK_ACTION}}"><button>{{LOCK_LABEL}}</button></form>
    </header>
    <div class="progress"><div style="width: {{PERCENT}}%"></div></div>
    <ul>
{{CARDS}}
    </ul>
  </main>
</body>
</html>
"#;
