//! Commented default config file.

pub(super) fn default_config_toml() -> String {
    r##"# dosplay configuration
# Schema version 1
# Only override what you want to change -- missing fields use defaults.

[sync]
# protocol_id = "dosplay"
# heartbeat_interval_ms = 5000     # 100-60000
# peer_timeout_ms = 15000          # at least 2x heartbeat_interval_ms
# prune_interval_ms = 7500         # 1000 to peer_timeout_ms
# dedup_capacity = 256             # per-sender seqs before the set is cleared
# input_buffer_capacity = 128      # key events held before the session starts
# max_pending = 1024               # unacknowledged sends remembered
# event_channel_capacity = 256

[logging]
# level = "INFO"                   # TRACE, DEBUG, INFO, WARNING, ERROR
"##
    .to_string()
}
