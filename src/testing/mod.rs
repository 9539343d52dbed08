// Testing support - deterministic synthetic drum fixtures
//
// Everything here is also compiled into the library so the CLI `synth`
// command and the integration tests share the exact same fixture audio.

pub mod signals;
