use rand::Rng;

/// One byte in this many is replaced on average.
const MUTATION_RATE: u32 = 8;

/// Randomizes bytes of a UDP payload in place. At least one byte is redrawn
/// unless the payload is empty.
pub fn mutate(payload: &mut [u8]) {
    if payload.is_empty() {
        return;
    }
    let mut rng = rand::rng();
    for byte in payload.iter_mut() {
        if rng.random_ratio(1, MUTATION_RATE) {
            *byte = rng.random();
        }
    }
    let forced = rng.random_range(0..payload.len());
    payload[forced] = rng.random();
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
