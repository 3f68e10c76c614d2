use vergen::{BuildBuilder, Emitter};

fn main() {
    if let Ok(build) = BuildBuilder::default().build_timestamp(true).build() {
        if let Ok(emitter) = Emitter::default().add_instructions(&build) {
            let _ = emitter.emit();
        }
    }
}
