use shared::protocol::PageView;

const PAGE_TEMPLATE: &str = r##"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>Counter App</title>
<style>
  :root {
    --primary: #2563eb;
    --secondary: #64748b;
    --positive: #10b981;
    --negative: #ef4444;
  }
  body { margin: 0; min-height: 100vh; display: flex; align-items: center; justify-content: center;
         background: #f9fafb; font-family: system-ui, sans-serif; }
  .card { width: 24rem; padding: 2rem; background: #fff; border-radius: 1rem;
          box-shadow: 0 20px 25px -5px rgba(0, 0, 0, 0.1); text-align: center; }
  h1 { margin: 0 0 0.5rem; font-size: 1.875rem; color: #1f2937; }
  .subtitle { margin: 0 0 1.5rem; font-size: 0.875rem; color: #6b7280; }
  #counter-value { margin-bottom: 2rem; font-size: 3.75rem; font-weight: 700; color: var(--primary); }
  .buttons { display: flex; gap: 1rem; justify-content: center; margin-bottom: 1rem; }
  .round { width: 4rem; height: 4rem; border: 0; border-radius: 50%; color: #fff;
           font-size: 1.5rem; font-weight: 700; cursor: pointer; }
  .minus { background: #ef4444; }
  .plus { background: #22c55e; }
  .reset { width: 100%; padding: 0.75rem; border: 0; border-radius: 0.5rem; background: #6b7280;
           color: #fff; font-weight: 600; cursor: pointer; }
  #status { margin-top: 1rem; font-size: 0.875rem; color: #6b7280; }
  #status[data-tone="positive"] { color: var(--positive); }
  #status[data-tone="negative"] { color: var(--negative); }
  details { margin-top: 1.5rem; text-align: left; font-size: 0.875rem; color: #4b5563; }
  #toast { position: fixed; bottom: 1.5rem; left: 50%; transform: translateX(-50%); padding: 0.75rem 1.25rem;
           border-radius: 0.5rem; background: var(--negative); color: #fff; display: none; }
</style>
</head>
<body>
<main class="card">
  <h1>🧮 Counter App</h1>
  <p class="subtitle">Persistent SQLite Counter</p>
  <div id="counter-value" data-counter="{{counter_name}}">{{value}}</div>
  <div class="buttons">
    <button class="round minus" data-action="decrement">-</button>
    <button class="round plus" data-action="increment">+</button>
  </div>
  <button class="reset" data-action="reset">Reset</button>
  <div id="status" data-tone="{{tone}}">{{status}}</div>
  <details>
    <summary>ℹ️ Info</summary>
    <p>This counter persists its value in a SQLite database.</p>
    <p>The counter value is stored and will be restored when you refresh the page.</p>
  </details>
</main>
<div id="toast" role="alert"></div>
<script>
  const display = document.getElementById("counter-value");
  const statusLine = document.getElementById("status");
  const toast = document.getElementById("toast");
  let revertTimer = null;
  let toastTimer = null;

  function setStatus(text, tone) {
    statusLine.textContent = text;
    statusLine.dataset.tone = tone;
  }

  function notify(message) {
    toast.textContent = message;
    toast.style.display = "block";
    clearTimeout(toastTimer);
    toastTimer = setTimeout(() => { toast.style.display = "none"; }, 4000);
  }

  function showError(message) {
    clearTimeout(revertTimer);
    setStatus("Error: " + message, "negative");
    notify("Error updating counter: " + message);
  }

  function render(view) {
    display.textContent = view.value;
    setStatus(view.status, view.tone);
    clearTimeout(revertTimer);
    if (view.revert_after_ms != null) {
      revertTimer = setTimeout(() => setStatus("Ready", "neutral"), view.revert_after_ms);
    }
    if (view.tone === "negative") {
      notify("Error updating counter: " + view.status.replace(/^Error: /, ""));
    }
  }

  async function press(action) {
    try {
      const response = await fetch("/counter/" + action, {
        method: "POST",
        headers: { "content-type": "application/json" },
        body: JSON.stringify({ displayed: display.textContent.trim() || "0" }),
      });
      const body = await response.json();
      if ("value" in body) {
        render(body);
      } else {
        showError(body.message || response.statusText);
      }
    } catch (err) {
      showError(String(err));
    }
  }

  document.querySelectorAll("button[data-action]").forEach((button) => {
    button.addEventListener("click", () => press(button.dataset.action));
  });
</script>
</body>
</html>
"##;

pub(crate) fn render_counter_page(view: &PageView) -> String {
    fill_template(PAGE_TEMPLATE, |key| match key {
        "counter_name" => Some(escape_html(&view.counter_name)),
        "value" => Some(view.value.to_string()),
        "tone" => Some(view.tone.as_str().to_string()),
        "status" => Some(escape_html(&view.status)),
        _ => None,
    })
}

/// Substitutes `{{key}}` placeholders in one left-to-right pass. Substituted
/// text is never scanned again; unknown keys are left as they are.
fn fill_template(template: &str, lookup: impl Fn(&str) -> Option<String>) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after_open = &rest[start + 2..];
        let Some(end) = after_open.find("}}") else {
            rest = &rest[start..];
            break;
        };
        let key = &after_open[..end];
        match lookup(key) {
            Some(value) => out.push_str(&value),
            None => out.push_str(&rest[start..start + 2 + end + 2]),
        }
        rest = &after_open[end + 2..];
    }
    out.push_str(rest);
    out
}

pub(crate) fn render_error_page(message: &str) -> String {
    format!(
        "<!DOCTYPE html><html lang=\"en\"><head><meta charset=\"utf-8\"><title>Counter App</title></head>\
         <body><h1>🧮 Counter App</h1><p>Error: {}</p></body></html>",
        escape_html(message)
    )
}

fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}
