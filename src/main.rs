mod gallery;

fn main() -> anyhow::Result<()> {
    gallery::run()
}
