use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;

use rayon::prelude::*;

/// Read a whole file by splitting it into one byte range per rayon worker
/// and reading the ranges in parallel.
///
/// Purely a throughput optimization: the ranges are reassembled in strict
/// offset order before returning, because everything downstream (header
/// framing, safety encoding) operates on the ordered byte stream.
pub fn read_file_ordered(path: &Path) -> io::Result<Vec<u8>> {
    let file_len = std::fs::metadata(path)?.len() as usize;
    if file_len == 0 {
        return Ok(Vec::new());
    }

    let workers = rayon::current_num_threads().max(1);
    let chunk_size = file_len.div_ceil(workers);

    let mut ranges = Vec::new();
    let mut start = 0usize;
    while start < file_len {
        let end = (start + chunk_size).min(file_len);
        ranges.push((start, end));
        start = end;
    }

    let chunks: Vec<io::Result<Vec<u8>>> = ranges
        .par_iter()
        .map(|&(start, end)| read_range(path, start, end))
        .collect();

    let mut out = Vec::with_capacity(file_len);
    for chunk in chunks {
        out.extend_from_slice(&chunk?);
    }
    Ok(out)
}

fn read_range(path: &Path, start: usize, end: usize) -> io::Result<Vec<u8>> {
    let mut file = File::open(path)?;
    file.seek(SeekFrom::Start(start as u64))?;
    let mut buf = vec![0u8; end - start];
    file.read_exact(&mut buf)?;
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(name: &str, data: &[u8]) -> std::path::PathBuf {
        let dir = std::env::temp_dir().join("vidbyte_test_chunker");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join(name);
        let mut f = File::create(&path).unwrap();
        f.write_all(data).unwrap();
        path
    }

    #[test]
    fn test_read_preserves_offset_order() {
        let data: Vec<u8> = (0..100_000u32).map(|i| (i % 251) as u8).collect();
        let path = write_temp("ordered.bin", &data);
        assert_eq!(read_file_ordered(&path).unwrap(), data);
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_read_small_file() {
        let path = write_temp("small.bin", b"abc");
        assert_eq!(read_file_ordered(&path).unwrap(), b"abc");
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_read_empty_file() {
        let path = write_temp("empty.bin", b"");
        assert!(read_file_ordered(&path).unwrap().is_empty());
        std::fs::remove_file(&path).ok();
    }
}
