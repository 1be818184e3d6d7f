//! Character streaming onto the output channels.

use crossbeam_channel::Sender;
use std::thread;
use std::time::Duration;

/// Stream one fragment's text character-by-character, then a newline.
///
/// The delay between characters emulates live typing; the trailing `'\n'`
/// marks the fragment boundary for the presentation layer. An empty text
/// still produces the newline.
///
/// Returns `false` if the receiver is gone, which means the pipeline is
/// shutting down and the caller should exit its loop.
pub(crate) fn stream_fragment(tx: &Sender<char>, text: &str, delay: Duration) -> bool {
    for ch in text.chars() {
        if tx.send(ch).is_err() {
            return false;
        }
        if !delay.is_zero() {
            thread::sleep(delay);
        }
    }
    tx.send('\n').is_ok()
}
