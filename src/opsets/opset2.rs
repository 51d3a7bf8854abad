//! Opset 2 adds `Gelu` and `MVN`.

opset_module! {
    OpsetVersion::Opset2;
    fn parameter(shape: Shape, dtype: DType) => constant::parameter;
    fn constant(value: impl Into<LiteralTensor>, dtype: Option<DType>) => constant::constant;
    fn add(a: impl Into<NodeInput>, b: impl Into<NodeInput>, auto_broadcast: Option<&str>) => elementwise::add;
    fn subtract(a: impl Into<NodeInput>, b: impl Into<NodeInput>, auto_broadcast: Option<&str>) => elementwise::subtract;
    fn multiply(a: impl Into<NodeInput>, b: impl Into<NodeInput>, auto_broadcast: Option<&str>) => elementwise::multiply;
    fn divide(a: impl Into<NodeInput>, b: impl Into<NodeInput>, auto_broadcast: Option<&str>) => elementwise::divide;
    fn maximum(a: impl Into<NodeInput>, b: impl Into<NodeInput>, auto_broadcast: Option<&str>) => elementwise::maximum;
    fn minimum(a: impl Into<NodeInput>, b: impl Into<NodeInput>, auto_broadcast: Option<&str>) => elementwise::minimum;
    fn power(a: impl Into<NodeInput>, b: impl Into<NodeInput>, auto_broadcast: Option<&str>) => elementwise::power;
    fn relu(data: impl Into<NodeInput>) => elementwise::relu;
    fn sigmoid(data: impl Into<NodeInput>) => elementwise::sigmoid;
    fn tanh(data: impl Into<NodeInput>) => elementwise::tanh;
    fn exp(data: impl Into<NodeInput>) => elementwise::exp;
    fn sqrt(data: impl Into<NodeInput>) => elementwise::sqrt;
    fn negative(data: impl Into<NodeInput>) => elementwise::negative;
    fn abs(data: impl Into<NodeInput>) => elementwise::abs;
    fn floor(data: impl Into<NodeInput>) => elementwise::floor;
    fn convert(data: impl Into<NodeInput>, destination_type: DType) => elementwise::convert;
    fn concat(inputs: impl IntoIterator<Item = impl Into<NodeInput>>, axis: i64) => data_movement::concat;
    fn reshape(data: impl Into<NodeInput>, shape: impl Into<NodeInput>, special_zero: bool) => data_movement::reshape;
    fn transpose(data: impl Into<NodeInput>, input_order: impl Into<NodeInput>) => data_movement::transpose;
    fn gather(data: impl Into<NodeInput>, indices: impl Into<NodeInput>, axis: impl Into<NodeInput>) => data_movement::gather;
    fn softmax(data: impl Into<NodeInput>, axis: Option<i64>) => data_movement::softmax;
    fn ctc_greedy_decoder(data: impl Into<NodeInput>, sequence_mask: impl Into<NodeInput>, ctc_merge_repeated: bool) => sequence::ctc_greedy_decoder;
    fn convolution(data: impl Into<NodeInput>, filters: impl Into<NodeInput>, attributes: &ConvolutionAttributes) => convolution::convolution;
    fn binary_convolution(data: impl Into<NodeInput>, filters: impl Into<NodeInput>, attributes: &ConvolutionAttributes, mode: &str, pad_value: f32) => convolution::binary_convolution;
    fn tensor_iterator(inputs: impl IntoIterator<Item = impl Into<NodeInput>>, body: CompositeSpec) => control_flow::tensor_iterator;
    fn shape_of(data: impl Into<NodeInput>) => data_movement::shape_of;
    fn top_k(data: impl Into<NodeInput>, k: impl Into<NodeInput>, axis: i64, mode: &str, sort: &str) => sequence::top_k;
    fn gelu(data: impl Into<NodeInput>) => elementwise::gelu;
    fn mvn(data: impl Into<NodeInput>, across_channels: Option<bool>, normalize_variance: Option<bool>, eps: f64) => normalization::mvn;
}
