use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::console::Keyboard;
use crate::error::LoadError;
use crate::memory::{Memory, MEMORY_MAX};

/// Load a big-endian image from `reader` into `mem`, returning its origin.
///
/// The first word is the origin; every following whole word is placed at consecutive
/// addresses from there. Words that would land past the end of the address space are dropped
/// rather than wrapped, and a trailing odd byte is ignored.
pub fn load_image<D: Keyboard>(
    mem: &mut Memory<D>,
    mut reader: impl Read,
) -> Result<u16, LoadError> {
    let mut buffer = Vec::new();
    reader
        .read_to_end(&mut buffer)
        .map_err(|source| LoadError::Read { path: None, source })?;

    let [hi, lo, body @ ..] = buffer.as_slice() else {
        return Err(LoadError::Truncated { path: None });
    };
    let orig = u16::from_be_bytes([*hi, *lo]);

    let dest = mem.tail_mut(orig);
    debug_assert_eq!(dest.len(), MEMORY_MAX - orig as usize);
    let words = body
        .chunks_exact(2)
        .map(|word| u16::from_be_bytes([word[0], word[1]]));
    for (slot, word) in dest.iter_mut().zip(words) {
        *slot = word;
    }
    Ok(orig)
}

/// Load the image stored at `path`. See [`load_image`].
pub fn load_file<D: Keyboard>(mem: &mut Memory<D>, path: &Path) -> Result<u16, LoadError> {
    let file = File::open(path).map_err(|source| LoadError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    load_image(mem, file).map_err(|e| e.in_file(path))
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::console::ScriptedConsole;

    fn memory() -> Memory<ScriptedConsole> {
        Memory::new(ScriptedConsole::new())
    }

    #[test]
    fn loads_at_origin() {
        let mut mem = memory();
        let image: &[u8] = &[0x30, 0x00, 0x12, 0x34, 0xab, 0xcd];
        assert_eq!(load_image(&mut mem, image).unwrap(), 0x3000);
        assert_eq!(mem.peek(0x2fff), 0);
        assert_eq!(mem.peek(0x3000), 0x1234);
        assert_eq!(mem.peek(0x3001), 0xabcd);
        assert_eq!(mem.peek(0x3002), 0);
    }

    #[test]
    fn truncated_header() {
        let mut mem = memory();
        assert!(matches!(
            load_image(&mut mem, &[0u8; 0][..]),
            Err(LoadError::Truncated { path: None })
        ));
        assert!(matches!(
            load_image(&mut mem, &[0x30u8][..]),
            Err(LoadError::Truncated { path: None })
        ));
    }

    #[test]
    fn header_only() {
        let mut mem = memory();
        assert_eq!(load_image(&mut mem, &[0x40u8, 0x00][..]).unwrap(), 0x4000);
        assert_eq!(mem.peek(0x4000), 0);
    }

    #[test]
    fn odd_trailing_byte_is_ignored() {
        let mut mem = memory();
        load_image(&mut mem, &[0x30u8, 0x00, 0x00, 0x01, 0x77][..]).unwrap();
        assert_eq!(mem.peek(0x3000), 0x0001);
        assert_eq!(mem.peek(0x3001), 0);
    }

    #[test]
    fn overflow_is_dropped_not_wrapped() {
        let mut mem = memory();
        let image: &[u8] = &[0xff, 0xfe, 0x00, 0x01, 0x00, 0x02, 0x00, 0x03, 0x00, 0x04];
        load_image(&mut mem, image).unwrap();
        assert_eq!(mem.peek(0xfffe), 1);
        assert_eq!(mem.peek(0xffff), 2);
        assert_eq!(mem.peek(0x0000), 0);
        assert_eq!(mem.peek(0x0001), 0);
    }

    #[test]
    fn zero_origin_covers_whole_space() {
        let mut mem = memory();
        let mut image: Vec<u8> = vec![0x00, 0x00];
        for _ in 0..MEMORY_MAX {
            image.extend([0x11, 0x11]);
        }
        load_image(&mut mem, image.as_slice()).unwrap();
        assert_eq!(mem.peek(0x0000), 0x1111);
        assert_eq!(mem.peek(0xffff), 0x1111);
    }

    #[test]
    fn later_images_overwrite() {
        let mut mem = memory();
        load_image(&mut mem, &[0x30u8, 0x00, 0x00, 0x01, 0x00, 0x02][..]).unwrap();
        load_image(&mut mem, &[0x30u8, 0x01, 0x00, 0x09][..]).unwrap();
        assert_eq!(mem.peek(0x3000), 1);
        assert_eq!(mem.peek(0x3001), 9);
    }

    #[test]
    fn missing_file() {
        let mut mem = memory();
        let err = load_file(&mut mem, Path::new("does/not/exist.obj")).unwrap_err();
        assert!(matches!(err, LoadError::Open { .. }));
    }

    #[test]
    fn truncated_file_is_named() {
        let mut mem = memory();
        let path = Path::new("tests/files/truncated.obj");
        let err = load_file(&mut mem, path).unwrap_err();
        assert!(matches!(&err, LoadError::Truncated { path: Some(p) } if p == path));
        assert!(err.to_string().contains("tests/files/truncated.obj"));
    }
}
