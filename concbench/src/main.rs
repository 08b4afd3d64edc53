fn main() -> anyhow::Result<()> {
    concbench::run()
}
