use std::io::{self, Write};
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

/// Build output handed to the contributor.
///
/// Mirrors the styling of `libherokubuildpack::log`, but writes to the stream it was constructed
/// with instead of the process-wide standard streams. Use [`termcolor::Buffer`] to capture output
/// in tests.
pub(crate) struct BuildLog<W> {
    stream: W,
}

impl BuildLog<StandardStream> {
    pub(crate) fn stdout() -> Self {
        Self::new(StandardStream::stdout(ColorChoice::Always))
    }
}

impl<W: WriteColor> BuildLog<W> {
    pub(crate) fn new(stream: W) -> Self {
        Self { stream }
    }

    pub(crate) fn info(&mut self, message: impl AsRef<str>) -> io::Result<()> {
        writeln!(self.stream, "{}", message.as_ref())?;
        self.stream.flush()
    }

    pub(crate) fn warning(&mut self, message: impl AsRef<str>) -> io::Result<()> {
        write_styled_message(
            &mut self.stream,
            message,
            ColorSpec::new().set_fg(Some(Color::Yellow)).set_bold(true),
        )?;
        self.stream.flush()
    }

    #[cfg(test)]
    pub(crate) fn into_inner(self) -> W {
        self.stream
    }
}

// Styles each line separately so colors don't leak into prefixes the platform adds to each line.
fn write_styled_message(
    stream: &mut impl WriteColor,
    message: impl AsRef<str>,
    spec: &ColorSpec,
) -> io::Result<()> {
    for line in message.as_ref().split('\n') {
        stream.set_color(spec)?;
        write!(stream, "{line}")?;
        stream.reset()?;
        writeln!(stream)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use termcolor::Buffer;

    #[test]
    fn warning_without_color() {
        let mut log = BuildLog::new(Buffer::no_color());
        log.warning("WARNING: first\nsecond").unwrap();

        assert_eq!(
            String::from_utf8(log.into_inner().into_inner()).unwrap(),
            "WARNING: first\nsecond\n"
        );
    }

    #[test]
    fn warning_with_color() {
        let mut log = BuildLog::new(Buffer::ansi());
        log.warning("WARNING: careful").unwrap();

        let output = String::from_utf8(log.into_inner().into_inner()).unwrap();
        assert!(output.contains("WARNING: careful"));
        assert!(output.starts_with("\u{1b}["));
    }

    #[test]
    fn info() {
        let mut log = BuildLog::new(Buffer::no_color());
        log.info("Writing php.ini").unwrap();

        assert_eq!(
            String::from_utf8(log.into_inner().into_inner()).unwrap(),
            "Writing php.ini\n"
        );
    }
}
