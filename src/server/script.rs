// src/server/script.rs

/// WebSocket endpoint the client script connects to.
pub const LIVE_RELOAD_PATH: &str = "/__sitepipe/livereload";

/// Route serving the client script itself.
pub const LIVE_RELOAD_SCRIPT_PATH: &str = "/__sitepipe/livereload.js";

const CLIENT_JS: &str = r#"(function () {
  var reloadOnRestart = __RELOAD_ON_RESTART__;
  var instance = null;

  function connect() {
    var proto = location.protocol === "https:" ? "wss:" : "ws:";
    var ws = new WebSocket(proto + "//" + location.host + "__ENDPOINT__");

    ws.onmessage = function (event) {
      var msg;
      try {
        msg = JSON.parse(event.data);
      } catch (e) {
        return;
      }
      if (msg.type === "hello") {
        if (instance !== null && instance !== msg.instance && reloadOnRestart) {
          location.reload();
          return;
        }
        instance = msg.instance;
      } else if (msg.type === "reload") {
        location.reload();
      }
    };

    ws.onclose = function () {
      setTimeout(connect, 1000);
    };
  }

  connect();
})();
"#;

/// Client script; reconnects every second after the socket closes.
pub fn client_script(reload_on_restart: bool) -> String {
    CLIENT_JS
        .replace("__RELOAD_ON_RESTART__", if reload_on_restart { "true" } else { "false" })
        .replace("__ENDPOINT__", LIVE_RELOAD_PATH)
}

/// Tag injected into served HTML pages.
pub fn script_tag() -> String {
    format!(r#"<script src="{LIVE_RELOAD_SCRIPT_PATH}"></script>"#)
}
