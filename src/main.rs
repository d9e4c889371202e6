fn main() {
  stride_coach_lib::run()
}
