fn main() {
    smallsh_rs::smallsh_main()
}
