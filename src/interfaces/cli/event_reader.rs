use crate::domain::payment::NavigationEvent;
use crate::error::{Result, WalletError};
use std::io::{BufRead, BufReader, Read};

/// Reads navigation events from a text source, one URL per line.
///
/// Blank lines and lines starting with `#` are skipped, so captured redirect
/// logs can be annotated.
pub struct EventReader<R: Read> {
    reader: BufReader<R>,
}

impl<R: Read> EventReader<R> {
    pub fn new(source: R) -> Self {
        Self {
            reader: BufReader::new(source),
        }
    }

    /// Lazily yields events in file order.
    pub fn events(self) -> impl Iterator<Item = Result<NavigationEvent>> {
        self.reader.lines().filter_map(|line| match line {
            Ok(line) => {
                let url = line.trim();
                if url.is_empty() || url.starts_with('#') {
                    None
                } else {
                    Some(Ok(NavigationEvent::new(url)))
                }
            }
            Err(e) => Some(Err(WalletError::from(e))),
        })
    }
}
