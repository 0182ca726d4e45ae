fn main() -> anyhow::Result<()> {
    captive::driver::main()
}
