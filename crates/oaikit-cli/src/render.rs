//! Terminal output for streamed text and capability reports.

use std::io::Write;

use oaikit_llm::{ModelCapabilities, StreamCallback, StreamDecoder, StreamEvent};

/// A callback that decodes server-sent events as they arrive and writes the
/// text deltas to `out`.
pub fn text_printer<W>(mut out: W) -> StreamCallback
where
    W: Write + Send + 'static,
{
    let mut decoder = StreamDecoder::new();
    StreamCallback::new(move |chunk, id| {
        let events = match decoder.push(chunk) {
            Ok(events) => events,
            Err(e) => {
                tracing::warn!(%id, error = %e, "skipping undecodable stream data");
                return true;
            }
        };
        for event in events {
            match event {
                StreamEvent::TextDelta(delta) => {
                    if out.write_all(delta.as_bytes()).is_err() {
                        return false;
                    }
                }
                StreamEvent::Error(message) => tracing::warn!(%id, %message, "stream error event"),
                _ => {}
            }
        }
        out.flush().is_ok()
    })
}

pub fn capabilities_report(model: &str, caps: &ModelCapabilities) -> String {
    format!(
        "model:               {model}\n\
         reasoning model:     {}\n\
         temperature:         {}\n\
         sampling params:     {}\n\
         output limit field:  {}\n\
         system role:         {}\n",
        yes_no(caps.is_reasoning_model),
        yes_no(caps.supports_temperature),
        yes_no(caps.supports_sampling_params),
        caps.max_tokens_field(),
        caps.default_system_role,
    )
}

fn yes_no(flag: bool) -> &'static str {
    if flag { "yes" } else { "no" }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oaikit_llm::{StreamId, resolve};
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct SharedBuf(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().expect("buf").extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn printer_writes_only_text_deltas() {
        let buf = SharedBuf::default();
        let mut callback = text_printer(buf.clone());
        let id = StreamId::next();

        let chunks = [
            "data: {\"type\":\"response.created\",\"response\":{}}\n\n",
            "data: {\"type\":\"response.output_text.delta\",\"delta\":\"Hel\"}\n\ndata: {\"type\":",
            "\"response.output_text.delta\",\"delta\":\"lo\"}\n\n",
        ];
        for chunk in chunks {
            assert!(callback.call(chunk, id));
        }

        let written = buf.0.lock().expect("buf").clone();
        assert_eq!(String::from_utf8(written).expect("utf8"), "Hello");
    }

    #[test]
    fn report_lists_reasoning_restrictions() {
        let report = capabilities_report("o3-mini", &resolve("o3-mini"));
        assert!(report.contains("reasoning model:     yes"));
        assert!(report.contains("temperature:         no"));
        assert!(report.contains("max_completion_tokens"));
        assert!(report.contains("system role:         system"));
    }
}
