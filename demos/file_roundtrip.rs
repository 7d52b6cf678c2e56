// Write through a shared file mapping, sync it, and read the file back.



use mapman::{MapCfg, MemoryMap, Protection};



fn main() {
    let path = std::env::temp_dir().join("MAPMAN_ROUNDTRIP");
    std::fs::write(&path, [b'.'; 32]).unwrap();

    let mut map = MemoryMap::new();
    if !map.map_file(&path, &MapCfg::new().protection(Protection::ReadWrite).offset(4).len(13)) {
        eprintln!("failed to map {}: {}", path.display(), map.last_error());
        std::process::exit(1);
    }

    map.data_mut().unwrap().copy_from_slice(b"Hello, world!");
    if !map.sync() {
        eprintln!("failed to sync: {}", map.last_error());
    }
    map.unmap();

    println!("{}", String::from_utf8_lossy(&std::fs::read(&path).unwrap()));
    std::fs::remove_file(&path).unwrap();
}
