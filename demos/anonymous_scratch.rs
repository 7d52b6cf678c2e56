// Use an anonymous mapping as a scratch buffer.



use mapman::{MemoryMap, Protection, Sharing};



fn main() {
    let mut scratch = MemoryMap::new();
    if !scratch.map_anonymous(1 << 20, Protection::ReadWrite, Sharing::Private) {
        eprintln!("failed to map scratch memory: {}", scratch.last_error());
        std::process::exit(1);
    }

    // Fresh anonymous pages are always zeroed.
    assert!(scratch.data().unwrap().iter().all(|&b| b == 0));

    let bytes = scratch.data_mut().unwrap();
    for (i, byte) in bytes.iter_mut().enumerate() {
        *byte = (i % 256) as u8;
    }
    let checksum: u64 = scratch.data().unwrap().iter().map(|&b| b as u64).sum();

    println!("{} bytes at {:p}, checksum {}", scratch.size(), scratch.as_ptr(), checksum);

    scratch.unmap();
    println!("mapped after unmap: {}", scratch.is_mapped());
}
