// Two threads share a status string through a named shared memory segment.



use arrayvec::ArrayString;
use mapman::MemoryMap;



// Remember, absolutely no pointers allowed in shared memory objects.
#[repr(C)]
struct Status {
    ticks: u32,
    label: ArrayString<16>,
}

fn status(map: &mut MemoryMap) -> &mut Status {
    let bytes = map.data_mut().unwrap();
    assert!(bytes.len() >= std::mem::size_of::<Status>());
    unsafe { &mut *(bytes.as_mut_ptr() as *mut Status) }
}

fn main() {
    let link = std::env::temp_dir().join("MAPMAN_SHARED_COUNTER");

    // Keep the owning map around for longer than every other map of the segment; the owner
    // removes the segment when it unmaps.
    let mut owner = MemoryMap::new();
    if !owner.map_shared(&link, std::mem::size_of::<Status>()) {
        eprintln!("failed to create segment: {}", owner.last_error());
        std::process::exit(1);
    }
    *status(&mut owner) = Status { ticks: 0, label: ArrayString::new() };

    let worker = {
        let link = link.clone();
        std::thread::spawn(move || {
            let mut map = MemoryMap::new();
            assert!(map.map_shared(&link, 0), "{}", map.last_error());
            for _ in 0..5 {
                let shared = status(&mut map);
                shared.ticks += 1;
                shared.label.clear();
                shared.label.push_str("working");
                std::thread::sleep(std::time::Duration::from_millis(10));
            }
            let shared = status(&mut map);
            shared.label.clear();
            shared.label.push_str("done");
        })
    };
    worker.join().unwrap();

    let shared = status(&mut owner);
    println!("{} after {} ticks", shared.label, shared.ticks);
    owner.unmap();
}
