fn main() {
    nowplaying_overlay_lib::run()
}
